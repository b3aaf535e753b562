//! Consistency checks for the producer/consumer links of a fusion.
//!
//! Definitions and use lists are back-references maintained alongside the
//! expression operands. This module checks that they agree:
//!
//! 1. Every output of an expression names that expression as its definition,
//!    and every definition lists the value among its outputs.
//! 2. Scalar use lists contain exactly the registered expressions reading the
//!    value.
//! 3. Tensor use lists, when the cache is valid, contain exactly the live
//!    expressions reading the value.
//! 4. Graph inputs and outputs agree with the per-value flags.

use std::collections::HashSet;
use std::fmt;

use derive_more::Display;

use crate::fusion::{Fusion, ValData};
use crate::refs::{ExprRef, ValRef};
use crate::types::ValType;

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum ValidationError {
    #[display("{val} is an output of {expr} but is not defined by it")]
    WrongDefinition { val: ValRef, expr: ExprRef },

    #[display("{val} is defined by {expr}, which does not list it as an output")]
    DanglingDefinition { val: ValRef, expr: ExprRef },

    #[display("{expr} reads {val}, which does not list it as a use")]
    MissingUse { val: ValRef, expr: ExprRef },

    #[display("{val} lists {expr} as a use, but {expr} does not read it")]
    StaleUse { val: ValRef, expr: ExprRef },

    #[display("{val} lists {expr} as a use, but {expr} is not a live reader")]
    DeadUse { val: ValRef, expr: ExprRef },

    #[display("{val} is a graph {role} but is not flagged as one")]
    UnflaggedBoundary { val: ValRef, role: &'static str },

    #[display("{val} is flagged as a graph {role} but is not one")]
    StrayBoundaryFlag { val: ValRef, role: &'static str },
}

/// Result of validation.
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "validation passed");
        }
        writeln!(f, "{} error(s) found:", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Check every producer/consumer link of `fusion`.
pub fn validate(fusion: &Fusion) -> ValidationResult {
    let mut errors = Vec::new();
    check_definitions(fusion, &mut errors);
    check_scalar_uses(fusion, &mut errors);
    if fusion.is_tv_use_info_valid() {
        check_tensor_uses(fusion, &mut errors);
    }
    check_boundary(fusion, &mut errors);
    ValidationResult { errors }
}

fn check_definitions(fusion: &Fusion, errors: &mut Vec<ValidationError>) {
    for expr in fusion.all_exprs() {
        for &val in fusion.expr(expr).outputs() {
            if fusion.definition(val) != Some(expr) {
                errors.push(ValidationError::WrongDefinition { val, expr });
            }
        }
    }
    for val in fusion.vals() {
        if let Some(expr) = fusion.definition(val) {
            if !fusion.expr(expr).outputs().contains(&val) {
                errors.push(ValidationError::DanglingDefinition { val, expr });
            }
        }
    }
}

/// Compare the use lists of the selected values against the inputs of `readers`.
fn check_uses(
    fusion: &Fusion,
    readers: &[ExprRef],
    is_checked: impl Fn(ValType) -> bool,
    errors: &mut Vec<ValidationError>,
) {
    let mut actual: HashSet<(ValRef, ExprRef)> = HashSet::new();
    for &expr in readers {
        for &val in fusion.expr(expr).inputs() {
            if is_checked(fusion.val(val).val_type()) {
                actual.insert((val, expr));
            }
        }
    }

    for &expr in readers {
        for &val in fusion.expr(expr).inputs() {
            if is_checked(fusion.val(val).val_type()) && !fusion.val(val).uses.contains(&expr) {
                errors.push(ValidationError::MissingUse { val, expr });
            }
        }
    }
    for val in fusion.vals() {
        let data = fusion.val(val);
        if !is_checked(data.val_type()) {
            continue;
        }
        for &expr in &data.uses {
            if actual.contains(&(val, expr)) {
                continue;
            }
            if fusion.expr(expr).inputs().contains(&val) {
                errors.push(ValidationError::DeadUse { val, expr });
            } else {
                errors.push(ValidationError::StaleUse { val, expr });
            }
        }
    }
}

fn check_scalar_uses(fusion: &Fusion, errors: &mut Vec<ValidationError>) {
    let all: Vec<_> = fusion.all_exprs().collect();
    check_uses(fusion, &all, |ty| ty != ValType::TensorView, errors);
}

fn check_tensor_uses(fusion: &Fusion, errors: &mut Vec<ValidationError>) {
    check_uses(fusion, &fusion.exprs(), |ty| ty == ValType::TensorView, errors);
}

fn check_boundary(fusion: &Fusion, errors: &mut Vec<ValidationError>) {
    check_role(fusion, "input", fusion.inputs(), ValData::is_fusion_input, errors);
    check_role(fusion, "output", fusion.outputs(), ValData::is_fusion_output, errors);
}

fn check_role(
    fusion: &Fusion,
    role: &'static str,
    listed: &[ValRef],
    is_flagged: fn(&ValData) -> bool,
    errors: &mut Vec<ValidationError>,
) {
    for &val in listed {
        if !is_flagged(fusion.val(val)) {
            errors.push(ValidationError::UnflaggedBoundary { val, role });
        }
    }
    for val in fusion.vals() {
        if is_flagged(fusion.val(val)) && !listed.contains(&val) {
            errors.push(ValidationError::StrayBoundaryFlag { val, role });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BinaryOpType, DataType, UnaryOpType};

    fn sample() -> Fusion {
        let mut fusion = Fusion::new();
        let t = fusion.new_tensor(1, DataType::Float);
        let n = fusion.new_int(None);
        fusion.add_input(t);
        fusion.add_input(n);
        let scaled = fusion.binary_op(BinaryOpType::Mul, t, n);
        let out = fusion.unary_op(UnaryOpType::Neg, scaled);
        fusion.add_output(out);
        fusion
    }

    #[test]
    fn consistent_graph_passes() {
        let mut fusion = sample();
        assert!(validate(&fusion).is_ok());
        fusion.reset_tv_uses();
        let result = validate(&fusion);
        assert!(result.is_ok(), "{result}");
        assert_eq!(result.to_string(), "validation passed");
    }

    #[test]
    fn copy_passes() {
        let (mut copy, _) = sample().copy();
        copy.reset_tv_uses();
        assert!(validate(&copy).is_ok());
    }

    #[test]
    fn detects_stale_and_missing_scalar_uses() {
        let mut fusion = Fusion::new();
        let a = fusion.new_int(None);
        let b = fusion.new_int(None);
        let c = fusion.unary_op(UnaryOpType::Neg, a);
        let neg = fusion.definition(c).unwrap();

        fusion.vals[a.id].uses.clear();
        fusion.vals[b.id].uses.push(neg);

        let result = validate(&fusion);
        assert_eq!(
            result.errors,
            [
                ValidationError::MissingUse { val: a, expr: neg },
                ValidationError::StaleUse { val: b, expr: neg },
            ]
        );
        assert_eq!(
            result.to_string(),
            format!(
                "2 error(s) found:\n  - {neg} reads {a}, which does not list it as a use\n  \
                 - {b} lists {neg} as a use, but {neg} does not read it\n"
            )
        );
    }

    #[test]
    fn detects_broken_definition() {
        let mut fusion = Fusion::new();
        let a = fusion.new_int(None);
        let b = fusion.unary_op(UnaryOpType::Neg, a);
        let neg = fusion.definition(b).unwrap();

        fusion.vals[b.id].definition = None;
        fusion.vals[a.id].definition = Some(neg);

        let errors = validate(&fusion).errors;
        assert!(errors.contains(&ValidationError::WrongDefinition { val: b, expr: neg }));
        assert!(errors.contains(&ValidationError::DanglingDefinition { val: a, expr: neg }));
    }

    #[test]
    fn tensor_uses_checked_only_when_cache_is_valid() {
        let mut fusion = sample();
        let t = fusion.inputs()[0];
        let dead = fusion.unary_op(UnaryOpType::Abs, t);
        let dead_expr = fusion.definition(dead).unwrap();
        assert!(!fusion.is_tv_use_info_valid());
        assert!(validate(&fusion).is_ok());

        fusion.reset_tv_uses();
        assert!(validate(&fusion).is_ok());

        // A rebuilt cache that still lists the dead reader.
        fusion.vals[t.id].uses.push(dead_expr);
        let result = validate(&fusion);
        assert_eq!(
            result.errors,
            [ValidationError::DeadUse { val: t, expr: dead_expr }]
        );
        assert_eq!(
            result.to_string(),
            format!(
                "1 error(s) found:\n  - {t} lists {dead_expr} as a use, \
                 but {dead_expr} is not a live reader\n"
            )
        );
    }

    #[test]
    fn detects_boundary_flag_mismatch() {
        let mut fusion = sample();
        let out = fusion.outputs()[0];
        fusion.vals[out.id].is_fusion_output = false;
        let n = fusion.inputs()[1];
        fusion.vals[n.id].is_fusion_output = true;

        assert_eq!(
            validate(&fusion).errors,
            [
                ValidationError::UnflaggedBoundary { val: out, role: "output" },
                ValidationError::StrayBoundaryFlag { val: n, role: "output" },
            ]
        );
    }
}
