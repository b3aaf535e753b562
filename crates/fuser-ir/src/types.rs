//! Kind tags and concrete node payloads.

use derive_more::Display;

// ============================================================================
// Tags
// ============================================================================

/// Element data type of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum DataType {
    #[display("bool")]
    Bool,
    #[display("double")]
    Double,
    #[display("float")]
    Float,
    #[display("half")]
    Half,
    #[display("int64")]
    Int,
    #[display("int32")]
    Int32,
}

impl DataType {
    pub fn is_integral(self) -> bool {
        matches!(self, DataType::Int | DataType::Int32)
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, DataType::Double | DataType::Float | DataType::Half)
    }
}

/// Coarse classification of a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ValType {
    Scalar,
    NamedScalar,
    TensorView,
}

impl ValType {
    /// Scalars and named scalars; tensors are not scalar.
    pub fn is_scalar(self) -> bool {
        matches!(self, ValType::Scalar | ValType::NamedScalar)
    }
}

/// Coarse classification of an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ExprType {
    UnaryOp,
    BinaryOp,
    TernaryOp,
}

impl ExprType {
    /// Number of inputs an expression of this type takes.
    pub fn arity(self) -> usize {
        match self {
            ExprType::UnaryOp => 1,
            ExprType::BinaryOp => 2,
            ExprType::TernaryOp => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum UnaryOpType {
    #[display("set")]
    Set,
    #[display("neg")]
    Neg,
    #[display("abs")]
    Abs,
    #[display("sqrt")]
    Sqrt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum BinaryOpType {
    #[display("add")]
    Add,
    #[display("sub")]
    Sub,
    #[display("mul")]
    Mul,
    #[display("div")]
    Div,
    #[display("mod")]
    Mod,
    #[display("ceilDiv")]
    CeilDiv,
    #[display("max")]
    Max,
    #[display("min")]
    Min,
    #[display("lt")]
    Lt,
    #[display("eq")]
    Eq,
}

impl BinaryOpType {
    /// Infix symbol used when printing, if the op has one.
    pub fn infix(self) -> Option<&'static str> {
        match self {
            BinaryOpType::Add => Some("+"),
            BinaryOpType::Sub => Some("-"),
            BinaryOpType::Mul => Some("*"),
            BinaryOpType::Div => Some("/"),
            BinaryOpType::Mod => Some("%"),
            BinaryOpType::Lt => Some("<"),
            BinaryOpType::Eq => Some("=="),
            BinaryOpType::CeilDiv | BinaryOpType::Max | BinaryOpType::Min => None,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOpType::Lt | BinaryOpType::Eq)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum TernaryOpType {
    #[display("where")]
    Where,
    #[display("clamp")]
    Clamp,
}

// ============================================================================
// Concrete payloads
// ============================================================================

/// Concrete kind of a value, with its kind-specific data.
///
/// Literal scalars hold `Some(value)` when the instance is marked constant.
#[derive(Clone, Debug, PartialEq)]
pub enum ValNode {
    Bool(Option<bool>),
    Double(Option<f64>),
    Int(Option<i64>),
    /// Symbolic scalar bound at launch time (e.g. `blockIdx.x`).
    NamedScalar(String),
    TensorView {
        ndims: usize,
    },
}

impl ValNode {
    pub fn val_type(&self) -> ValType {
        match self {
            ValNode::Bool(_) | ValNode::Double(_) | ValNode::Int(_) => ValType::Scalar,
            ValNode::NamedScalar(_) => ValType::NamedScalar,
            ValNode::TensorView { .. } => ValType::TensorView,
        }
    }

    /// Whether this is a literal carrying a constant value.
    pub fn is_const_literal(&self) -> bool {
        match self {
            ValNode::Bool(v) => v.is_some(),
            ValNode::Double(v) => v.is_some(),
            ValNode::Int(v) => v.is_some(),
            ValNode::NamedScalar(_) | ValNode::TensorView { .. } => false,
        }
    }
}

/// Concrete kind of an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Unary(UnaryOpType),
    Binary(BinaryOpType),
    Ternary(TernaryOpType),
}

impl ExprKind {
    pub fn expr_type(self) -> ExprType {
        match self {
            ExprKind::Unary(_) => ExprType::UnaryOp,
            ExprKind::Binary(_) => ExprType::BinaryOp,
            ExprKind::Ternary(_) => ExprType::TernaryOp,
        }
    }
}

impl From<UnaryOpType> for ExprKind {
    fn from(op: UnaryOpType) -> Self {
        ExprKind::Unary(op)
    }
}

impl From<BinaryOpType> for ExprKind {
    fn from(op: BinaryOpType) -> Self {
        ExprKind::Binary(op)
    }
}

impl From<TernaryOpType> for ExprKind {
    fn from(op: TernaryOpType) -> Self {
        ExprKind::Ternary(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_classification() {
        assert!(ValNode::Int(None).val_type().is_scalar());
        assert!(ValNode::NamedScalar("threadIdx.x".into()).val_type().is_scalar());
        assert!(!ValNode::TensorView { ndims: 2 }.val_type().is_scalar());
    }

    #[test]
    fn const_literal_requires_value() {
        assert!(ValNode::Int(Some(0)).is_const_literal());
        assert!(!ValNode::Double(None).is_const_literal());
        assert!(!ValNode::NamedScalar("blockDim.x".into()).is_const_literal());
    }

    #[test]
    fn expr_arity() {
        assert_eq!(ExprKind::from(UnaryOpType::Neg).expr_type().arity(), 1);
        assert_eq!(ExprKind::from(BinaryOpType::Add).expr_type().arity(), 2);
        assert_eq!(ExprKind::from(TernaryOpType::Where).expr_type().arity(), 3);
    }
}
