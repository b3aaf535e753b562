//! Expression construction.
//!
//! An expression never reaches its fusion half-built: [`ExprBuilder`]
//! collects the kind, inputs and outputs, and only [`ExprBuilder::build`]
//! registers the finished node.

use smallvec::SmallVec;

use crate::fusion::Fusion;
use crate::refs::{ExprRef, ValRef};
use crate::types::{BinaryOpType, DataType, ExprKind, TernaryOpType, UnaryOpType, ValNode};

/// Builder for a fully wired expression.
pub struct ExprBuilder {
    kind: ExprKind,
    inputs: SmallVec<[ValRef; 4]>,
    outputs: SmallVec<[ValRef; 2]>,
}

impl ExprBuilder {
    pub fn new(kind: impl Into<ExprKind>) -> Self {
        Self {
            kind: kind.into(),
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
        }
    }

    pub fn input(mut self, v: ValRef) -> Self {
        self.inputs.push(v);
        self
    }

    pub fn inputs(mut self, vs: impl IntoIterator<Item = ValRef>) -> Self {
        self.inputs.extend(vs);
        self
    }

    pub fn output(mut self, v: ValRef) -> Self {
        self.outputs.push(v);
        self
    }

    pub fn outputs(mut self, vs: impl IntoIterator<Item = ValRef>) -> Self {
        self.outputs.extend(vs);
        self
    }

    /// Register the expression with `fusion`, setting the definition of every
    /// output and adding the expression to every input's uses.
    ///
    /// # Panics
    ///
    /// Panics if a value belongs to another fusion, if the input count does
    /// not match the kind, or if an output already has a definition.
    pub fn build(self, fusion: &mut Fusion) -> ExprRef {
        fusion.register_expr(self.kind, self.inputs, self.outputs)
    }
}

// ============================================================================
// Convenience constructors
// ============================================================================

fn promote(a: DataType, b: DataType) -> DataType {
    use DataType::*;
    match (a, b) {
        (Double, _) | (_, Double) => Double,
        (Float, _) | (_, Float) => Float,
        (Half, _) | (_, Half) => Half,
        (Int, _) | (_, Int) => Int,
        (Int32, _) | (_, Int32) => Int32,
        (Bool, Bool) => Bool,
    }
}

impl Fusion {
    /// Allocate the output value of an op over `operands`.
    ///
    /// Any tensor operand makes the result a tensor of the widest rank;
    /// comparisons produce booleans, everything else the promoted type.
    fn new_result(&mut self, operands: &[ValRef], comparison: bool) -> ValRef {
        let mut dtype = self.data_type(operands[0]);
        let mut ndims = None;
        for &v in operands {
            dtype = promote(dtype, self.data_type(v));
            if let ValNode::TensorView { ndims: n } = *self.val(v).node() {
                ndims = Some(ndims.map_or(n, |m: usize| m.max(n)));
            }
        }
        if comparison {
            dtype = DataType::Bool;
        }

        let node = match ndims {
            Some(ndims) => ValNode::TensorView { ndims },
            None if dtype == DataType::Bool => ValNode::Bool(None),
            None if dtype.is_floating_point() => ValNode::Double(None),
            None => ValNode::Int(None),
        };
        self.create_val(node, Some(dtype), true)
    }

    /// Build `op(input)` and return its output.
    pub fn unary_op(&mut self, op: UnaryOpType, input: ValRef) -> ValRef {
        let out = self.new_result(&[input], false);
        ExprBuilder::new(op).input(input).output(out).build(self);
        out
    }

    /// Build `op(lhs, rhs)` and return its output.
    pub fn binary_op(&mut self, op: BinaryOpType, lhs: ValRef, rhs: ValRef) -> ValRef {
        let out = self.new_result(&[lhs, rhs], op.is_comparison());
        ExprBuilder::new(op)
            .input(lhs)
            .input(rhs)
            .output(out)
            .build(self);
        out
    }

    /// Build `op(a, b, c)` and return its output.
    ///
    /// For `where`, the result type comes from the two selected operands.
    pub fn ternary_op(&mut self, op: TernaryOpType, a: ValRef, b: ValRef, c: ValRef) -> ValRef {
        let out = match op {
            TernaryOpType::Where => self.new_result(&[b, c], false),
            TernaryOpType::Clamp => self.new_result(&[a, b, c], false),
        };
        ExprBuilder::new(op)
            .inputs([a, b, c])
            .output(out)
            .build(self);
        out
    }
}
