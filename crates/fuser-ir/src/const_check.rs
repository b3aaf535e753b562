//! Compile-time constness analysis.

use std::collections::HashSet;

use crate::dispatch::{ConstDispatch, route_expr, route_val};
use crate::fusion::Fusion;
use crate::refs::{ExprRef, ValRef};
use crate::types::{BinaryOpType, TernaryOpType, UnaryOpType};

/// Decides whether a value is computable at compile time.
///
/// A value is constant when every leaf it transitively depends on is a
/// literal carrying a value. Symbolic scalars and tensors are never
/// constant, and neither is a value that depends on itself.
pub struct ConstCheck {
    is_const: bool,
    visited: HashSet<ExprRef>,
    /// Expressions whose inputs are still being visited.
    in_progress: HashSet<ExprRef>,
}

impl ConstCheck {
    pub fn is_const(fusion: &Fusion, val: ValRef) -> bool {
        let mut check = ConstCheck {
            is_const: true,
            visited: HashSet::new(),
            in_progress: HashSet::new(),
        };
        check.handle_val(fusion, val);
        check.is_const
    }

    fn visit_inputs(&mut self, fusion: &Fusion, expr: ExprRef) {
        for &input in fusion.expr(expr).inputs() {
            if !self.is_const {
                return;
            }
            self.handle_val(fusion, input);
        }
    }
}

impl ConstDispatch for ConstCheck {
    fn handle_bool(&mut self, _: &Fusion, _: ValRef, value: Option<bool>) {
        self.is_const &= value.is_some();
    }

    fn handle_double(&mut self, _: &Fusion, _: ValRef, value: Option<f64>) {
        self.is_const &= value.is_some();
    }

    fn handle_int(&mut self, _: &Fusion, _: ValRef, value: Option<i64>) {
        self.is_const &= value.is_some();
    }

    fn handle_named_scalar(&mut self, _: &Fusion, _: ValRef, _: &str) {
        self.is_const = false;
    }

    fn handle_tensor_view(&mut self, _: &Fusion, _: ValRef, _: usize) {
        self.is_const = false;
    }

    fn handle_unary_op(&mut self, fusion: &Fusion, expr: ExprRef, _: UnaryOpType) {
        self.visit_inputs(fusion, expr);
    }

    fn handle_binary_op(&mut self, fusion: &Fusion, expr: ExprRef, _: BinaryOpType) {
        self.visit_inputs(fusion, expr);
    }

    fn handle_ternary_op(&mut self, fusion: &Fusion, expr: ExprRef, _: TernaryOpType) {
        self.visit_inputs(fusion, expr);
    }

    fn handle_expr(&mut self, fusion: &Fusion, expr: ExprRef) {
        if self.in_progress.contains(&expr) {
            // Reached again through its own inputs: a cycle.
            self.is_const = false;
            return;
        }
        if self.visited.insert(expr) {
            self.in_progress.insert(expr);
            route_expr(self, fusion, expr);
            self.in_progress.remove(&expr);
        }
    }

    fn handle_val(&mut self, fusion: &Fusion, val: ValRef) {
        match fusion.definition(val) {
            Some(def) => self.handle_expr(fusion, def),
            None => route_val(self, fusion, val),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprBuilder;
    use crate::types::DataType;

    #[test]
    fn literal_arithmetic_is_const() {
        let mut fusion = Fusion::new();
        let two = fusion.new_int(Some(2));
        let three = fusion.new_int(Some(3));
        let sum = fusion.binary_op(BinaryOpType::Add, two, three);
        let neg = fusion.unary_op(UnaryOpType::Neg, sum);
        assert!(ConstCheck::is_const(&fusion, sum));
        assert!(ConstCheck::is_const(&fusion, neg));
    }

    #[test]
    fn free_scalar_poisons_result() {
        let mut fusion = Fusion::new();
        let two = fusion.new_int(Some(2));
        let free = fusion.new_int(None);
        let sum = fusion.binary_op(BinaryOpType::Mul, two, free);
        assert!(!ConstCheck::is_const(&fusion, free));
        assert!(!ConstCheck::is_const(&fusion, sum));
    }

    #[test]
    fn symbolic_leaves_are_not_const() {
        let mut fusion = Fusion::new();
        let tid = fusion.new_named_scalar("threadIdx.x", DataType::Int);
        let t = fusion.new_tensor(1, DataType::Float);
        let one = fusion.new_int(Some(1));
        let shifted = fusion.binary_op(BinaryOpType::Add, tid, one);
        assert!(!ConstCheck::is_const(&fusion, tid));
        assert!(!ConstCheck::is_const(&fusion, t));
        assert!(!ConstCheck::is_const(&fusion, shifted));
    }

    #[test]
    fn shared_subexpression_is_visited_once() {
        let mut fusion = Fusion::new();
        let x = fusion.new_double(Some(0.5));
        let sq = fusion.binary_op(BinaryOpType::Mul, x, x);
        let quad = fusion.binary_op(BinaryOpType::Mul, sq, sq);
        assert!(ConstCheck::is_const(&fusion, quad));
    }

    #[test]
    fn cycle_is_not_const() {
        let mut fusion = Fusion::new();
        let a = fusion.new_int(None);
        let b = fusion.new_int(None);
        ExprBuilder::new(UnaryOpType::Neg)
            .input(a)
            .output(b)
            .build(&mut fusion);
        ExprBuilder::new(UnaryOpType::Neg)
            .input(b)
            .output(a)
            .build(&mut fusion);
        assert!(!ConstCheck::is_const(&fusion, a));
        assert!(!fusion.is_const_scalar(b));
    }
}
