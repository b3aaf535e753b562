//! Node model of the fuser compute-graph IR.
//!
//! A [`Fusion`] owns every value ([`ValRef`]) and expression ([`ExprRef`]) of
//! one graph. Nodes are created through the fusion and die with it, so there
//! is no way to construct a node that does not belong to one:
//!
//! ```compile_fail
//! use fuser_ir::{ExprBuilder, types::UnaryOpType};
//!
//! // `build` needs the owning fusion.
//! let expr = ExprBuilder::new(UnaryOpType::Neg).build();
//! ```
//!
//! ```
//! use fuser_ir::{Fusion, print_stmt, types::BinaryOpType};
//!
//! let mut fusion = Fusion::new();
//! let two = fusion.new_int(Some(2));
//! let three = fusion.new_int(Some(3));
//! let sum = fusion.binary_op(BinaryOpType::Add, two, three);
//! fusion.add_output(sum);
//!
//! assert!(fusion.is_const_scalar(sum));
//! let add = fusion.definition(sum).unwrap();
//! assert_eq!(print_stmt(&fusion, add), "i2 = 2 + 3");
//! ```
//!
//! Passes operate on concrete node kinds through [`ConstDispatch`] and
//! [`MutDispatch`].

pub mod cloner;
pub mod const_check;
pub mod dispatch;
pub mod errors;
pub mod expr;
pub mod fusion;
pub mod printer;
pub mod refs;
pub mod simplify;
pub mod types;
pub mod validation;

mod statement;
mod val;

pub use cloner::{CloneMap, IrCloner};
pub use const_check::ConstCheck;
pub use dispatch::{ConstDispatch, MutDispatch};
pub use errors::{IrError, IrResult};
pub use expr::ExprBuilder;
pub use fusion::{ExprData, Fusion, ValData};
pub use printer::{IrPrinter, print_fusion, print_stmt};
pub use refs::{ExprId, ExprRef, FusionId, StmtName, StmtRef, ValId, ValRef};
pub use simplify::{IdentitySimplifier, simplify_identities};
pub use types::{DataType, ExprKind, ExprType, ValNode, ValType};
pub use validation::{ValidationError, ValidationResult, validate};
