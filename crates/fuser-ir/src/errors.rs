//! Error types for the fusion IR.

use derive_more::{Display, Error};

use crate::refs::{FusionId, StmtRef, ValRef};

pub type IrResult<T> = Result<T, IrError>;

/// A violated IR contract.
///
/// Most public APIs panic with this error's message, since a violation means
/// the calling code is wrong. The `try_*` variants return it instead.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum IrError {
    #[display("Cannot cast to Val as {stmt} is not a Val.")]
    NotAVal { stmt: StmtRef },

    #[display("Cannot cast to Expr as {stmt} is not an Expr.")]
    NotAnExpr { stmt: StmtRef },

    #[display("{stmt} belongs to {owner}, not {expected}")]
    ForeignStatement {
        stmt: StmtRef,
        owner: FusionId,
        expected: FusionId,
    },

    #[display("Value {val} does not have a data type.")]
    MissingDataType { val: ValRef },
}
