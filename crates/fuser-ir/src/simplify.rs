//! Algebraic identity folding.
//!
//! Binary expressions whose result equals one operand (`x + 0`, `0 + x`,
//! `x - 0`, `x * 1`, `1 * x`, `x / 1`, `ceilDiv(x, 1)`) are rewritten in place
//! to `set(x)`. The output value keeps its identity, so consumers need no
//! update.

use tracing::debug;

use crate::dispatch::MutDispatch;
use crate::fusion::Fusion;
use crate::refs::{ExprRef, ValRef};
use crate::types::{BinaryOpType, TernaryOpType, UnaryOpType};

#[derive(Default)]
pub struct IdentitySimplifier {
    rewrites: usize,
}

impl IdentitySimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of expressions rewritten so far.
    pub fn rewrites(&self) -> usize {
        self.rewrites
    }
}

impl MutDispatch for IdentitySimplifier {
    fn mutate_bool(&mut self, _: &mut Fusion, _: ValRef) {}
    fn mutate_double(&mut self, _: &mut Fusion, _: ValRef) {}
    fn mutate_int(&mut self, _: &mut Fusion, _: ValRef) {}
    fn mutate_named_scalar(&mut self, _: &mut Fusion, _: ValRef) {}
    fn mutate_tensor_view(&mut self, _: &mut Fusion, _: ValRef) {}

    fn mutate_unary_op(&mut self, _: &mut Fusion, _: ExprRef, _: UnaryOpType) {}

    fn mutate_binary_op(&mut self, fusion: &mut Fusion, expr: ExprRef, op: BinaryOpType) {
        let data = fusion.expr(expr);
        let (lhs, rhs) = (data.input(0), data.input(1));
        let kept = match op {
            BinaryOpType::Add if fusion.is_zero_int(rhs) => lhs,
            BinaryOpType::Add if fusion.is_zero_int(lhs) => rhs,
            BinaryOpType::Sub if fusion.is_zero_int(rhs) => lhs,
            BinaryOpType::Mul if fusion.is_one_int(rhs) => lhs,
            BinaryOpType::Mul if fusion.is_one_int(lhs) => rhs,
            BinaryOpType::Div | BinaryOpType::CeilDiv if fusion.is_one_int(rhs) => lhs,
            _ => return,
        };
        fusion.rewrite_expr(expr, UnaryOpType::Set.into(), [kept]);
        self.rewrites += 1;
    }

    fn mutate_ternary_op(&mut self, _: &mut Fusion, _: ExprRef, _: TernaryOpType) {}
}

/// Fold identities in every live expression. Returns the number of rewrites.
pub fn simplify_identities(fusion: &mut Fusion) -> usize {
    let mut pass = IdentitySimplifier::new();
    for expr in fusion.exprs() {
        pass.mutate_expr(fusion, expr);
    }
    debug!(fusion = %fusion.id(), rewrites = pass.rewrites(), "simplified identities");
    pass.rewrites()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, ExprKind};

    #[test]
    fn folds_additive_and_multiplicative_identities() {
        let mut fusion = Fusion::new();
        let x = fusion.new_int(None);
        fusion.add_input(x);
        let zero = fusion.new_int(Some(0));
        let one = fusion.new_int(Some(1));
        let a = fusion.binary_op(BinaryOpType::Add, zero, x);
        let b = fusion.binary_op(BinaryOpType::Mul, a, one);
        let c = fusion.binary_op(BinaryOpType::CeilDiv, b, one);
        fusion.add_output(c);

        assert_eq!(simplify_identities(&mut fusion), 3);
        for (out, kept) in [(a, x), (b, a), (c, b)] {
            let def = fusion.definition(out).unwrap();
            assert_eq!(fusion.expr(def).kind(), ExprKind::Unary(UnaryOpType::Set));
            assert_eq!(fusion.expr(def).inputs(), &[kept]);
        }
        assert!(fusion.uses(zero).is_empty());
        assert!(fusion.uses(one).is_empty());
    }

    #[test]
    fn leaves_non_identities_alone() {
        let mut fusion = Fusion::new();
        let x = fusion.new_int(None);
        let zero = fusion.new_int(Some(0));
        let two = fusion.new_int(Some(2));
        let d = fusion.binary_op(BinaryOpType::Sub, zero, x);
        let q = fusion.binary_op(BinaryOpType::Div, two, d);
        let m = fusion.binary_op(BinaryOpType::Mul, q, two);
        fusion.add_output(m);

        assert_eq!(simplify_identities(&mut fusion), 0);
        let def = fusion.definition(d).unwrap();
        assert_eq!(fusion.expr(def).kind(), ExprKind::Binary(BinaryOpType::Sub));
    }

    #[test]
    fn tensor_operand_is_kept() {
        let mut fusion = Fusion::new();
        let t = fusion.new_tensor(2, DataType::Float);
        fusion.add_input(t);
        let one = fusion.new_int(Some(1));
        let scaled = fusion.binary_op(BinaryOpType::Mul, one, t);
        fusion.add_output(scaled);

        assert_eq!(simplify_identities(&mut fusion), 1);
        assert!(!fusion.is_tv_use_info_valid());
        let def = fusion.definition(scaled).unwrap();
        assert_eq!(fusion.uses(t), &[def]);
    }

    #[test]
    fn dead_expressions_are_not_visited() {
        let mut fusion = Fusion::new();
        let x = fusion.new_int(None);
        let zero = fusion.new_int(Some(0));
        let dead = fusion.binary_op(BinaryOpType::Add, x, zero);
        let live = fusion.unary_op(UnaryOpType::Neg, x);
        fusion.add_output(live);

        assert_eq!(simplify_identities(&mut fusion), 0);
        let def = fusion.definition(dead).unwrap();
        assert_eq!(fusion.expr(def).kind(), ExprKind::Binary(BinaryOpType::Add));
    }
}
