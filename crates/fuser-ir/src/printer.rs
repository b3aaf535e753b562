//! Diagnostic text rendering of fusion IR.
//!
//! Values print in a short form: literals as their value, free scalars as a
//! type letter followed by their name, named scalars as their symbol and
//! tensors as `T` followed by their name. Expressions print as one line:
//!
//! ```text
//! fusion {
//!   inputs: i0, i1
//!   outputs: i4
//!   i2 = i0 + i1
//!   i4 = neg(i2)
//! }
//! ```
//!
//! The format is meant for people, not for parsing back.

use std::fmt::{self, Write};

use crate::dispatch::{ConstDispatch, route_stmt};
use crate::fusion::Fusion;
use crate::refs::{ExprRef, StmtRef, ValRef};
use crate::types::{BinaryOpType, TernaryOpType, UnaryOpType};

/// Renders statements into a string buffer.
#[derive(Default)]
pub struct IrPrinter {
    out: String,
}

impl IrPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        self.out
            .write_fmt(args)
            .expect("fmt::Write to String never fails");
    }

    fn name(fusion: &Fusion, val: ValRef) -> String {
        match fusion.val(val).name() {
            Some(name) => name.to_string(),
            None => "?".to_owned(),
        }
    }

    fn write_vals(&mut self, fusion: &Fusion, vals: &[ValRef]) {
        for (i, &v) in vals.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.handle_val(fusion, v);
        }
    }

    fn write_call(&mut self, fusion: &Fusion, expr: ExprRef, op: &dyn fmt::Display) {
        let data = fusion.expr(expr);
        self.write_vals(fusion, data.outputs());
        self.emit(format_args!(" = {op}("));
        self.write_vals(fusion, data.inputs());
        self.out.push(')');
    }
}

impl ConstDispatch for IrPrinter {
    fn handle_bool(&mut self, fusion: &Fusion, val: ValRef, value: Option<bool>) {
        match value {
            Some(b) => self.emit(format_args!("{b}")),
            None => self.emit(format_args!("b{}", Self::name(fusion, val))),
        }
    }

    fn handle_double(&mut self, fusion: &Fusion, val: ValRef, value: Option<f64>) {
        match value {
            Some(d) => self.emit(format_args!("{d:?}")),
            None => self.emit(format_args!("d{}", Self::name(fusion, val))),
        }
    }

    fn handle_int(&mut self, fusion: &Fusion, val: ValRef, value: Option<i64>) {
        match value {
            Some(i) => self.emit(format_args!("{i}")),
            None => self.emit(format_args!("i{}", Self::name(fusion, val))),
        }
    }

    fn handle_named_scalar(&mut self, _: &Fusion, _: ValRef, name: &str) {
        self.out.push_str(name);
    }

    fn handle_tensor_view(&mut self, fusion: &Fusion, val: ValRef, _: usize) {
        self.emit(format_args!("T{}", Self::name(fusion, val)));
    }

    fn handle_unary_op(&mut self, fusion: &Fusion, expr: ExprRef, op: UnaryOpType) {
        self.write_call(fusion, expr, &op);
    }

    fn handle_binary_op(&mut self, fusion: &Fusion, expr: ExprRef, op: BinaryOpType) {
        let Some(symbol) = op.infix() else {
            return self.write_call(fusion, expr, &op);
        };
        let data = fusion.expr(expr);
        self.write_vals(fusion, data.outputs());
        self.out.push_str(" = ");
        self.handle_val(fusion, data.input(0));
        self.emit(format_args!(" {symbol} "));
        self.handle_val(fusion, data.input(1));
    }

    fn handle_ternary_op(&mut self, fusion: &Fusion, expr: ExprRef, op: TernaryOpType) {
        self.write_call(fusion, expr, &op);
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Render one statement.
pub fn print_stmt(fusion: &Fusion, stmt: impl Into<StmtRef>) -> String {
    let mut printer = IrPrinter::new();
    route_stmt(&mut printer, fusion, stmt.into());
    printer.finish()
}

/// Render the graph boundary and every live expression, producers first.
pub fn print_fusion(fusion: &Fusion) -> String {
    let mut printer = IrPrinter::new();
    printer.out.push_str("fusion {\n");
    for (label, vals) in [("inputs", fusion.inputs()), ("outputs", fusion.outputs())] {
        printer.emit(format_args!("  {label}: "));
        if vals.is_empty() {
            printer.out.push_str("(none)");
        } else {
            printer.write_vals(fusion, vals);
        }
        printer.out.push('\n');
    }
    for expr in fusion.exprs() {
        printer.out.push_str("  ");
        printer.handle_expr(fusion, expr);
        printer.out.push('\n');
    }
    printer.out.push_str("}\n");
    printer.finish()
}

impl Fusion {
    /// Print `stmt` to standard output.
    pub fn print(&self, stmt: impl Into<StmtRef>) {
        println!("{}", print_stmt(self, stmt));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn literals_and_symbols() {
        let mut fusion = Fusion::new();
        let t = fusion.new_bool(Some(true));
        let d = fusion.new_double(Some(1.5));
        let i = fusion.new_int(Some(-4));
        let tid = fusion.new_named_scalar("threadIdx.x", DataType::Int);
        assert_eq!(print_stmt(&fusion, t), "true");
        assert_eq!(print_stmt(&fusion, d), "1.5");
        assert_eq!(print_stmt(&fusion, i), "-4");
        assert_eq!(print_stmt(&fusion, tid), "threadIdx.x");
    }

    #[test]
    fn free_values_use_their_names() {
        let mut fusion = Fusion::new();
        let i = fusion.new_int(None);
        let d = fusion.new_double(None);
        let t = fusion.new_tensor(2, DataType::Float);
        let anon = fusion.create_val(crate::types::ValNode::Bool(None), Some(DataType::Bool), false);
        assert_eq!(print_stmt(&fusion, i), "i0");
        assert_eq!(print_stmt(&fusion, d), "d1");
        assert_eq!(print_stmt(&fusion, t), "T2");
        assert_eq!(print_stmt(&fusion, anon), "b?");
    }

    #[test]
    fn expression_lines() {
        let mut fusion = Fusion::new();
        let a = fusion.new_int(None);
        let b = fusion.new_int(None);
        let sum = fusion.binary_op(BinaryOpType::Add, a, b);
        let up = fusion.binary_op(BinaryOpType::CeilDiv, sum, b);
        let neg = fusion.unary_op(UnaryOpType::Neg, up);

        let line = |v: ValRef| print_stmt(&fusion, fusion.definition(v).unwrap());
        assert_eq!(line(sum), "i2 = i0 + i1");
        assert_eq!(line(up), "i4 = ceilDiv(i2, i1)");
        assert_eq!(line(neg), "i6 = neg(i4)");
    }

    #[test]
    fn whole_fusion() {
        let mut fusion = Fusion::new();
        let x = fusion.new_double(None);
        fusion.add_input(x);
        let half = fusion.new_double(Some(0.5));
        let scaled = fusion.binary_op(BinaryOpType::Mul, x, half);
        fusion.add_output(scaled);

        insta::assert_snapshot!(print_fusion(&fusion).trim_end(), @r"
fusion {
  inputs: d0
  outputs: d2
  d2 = d0 * 0.5
}
");
    }

    #[test]
    fn empty_fusion() {
        let fusion = Fusion::new();
        assert_eq!(
            print_fusion(&fusion),
            "fusion {\n  inputs: (none)\n  outputs: (none)\n}\n"
        );
    }
}
