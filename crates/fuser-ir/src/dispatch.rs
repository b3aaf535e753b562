//! Double dispatch over the closed set of node kinds.
//!
//! Node kinds are a closed `match` in this module; operations over them are
//! open. An operation implements [`ConstDispatch`] (read-only) or
//! [`MutDispatch`] (may mutate the fusion) and must provide one handler per
//! concrete kind, so adding a kind is a compile error at every operation
//! until it is handled.
//!
//! The `handle_*`/`mutate_*` entry points for statements, values and
//! expressions are provided methods that simply route to the per-kind
//! handler. An operation may override them to intercept a whole category,
//! then call the matching `route_*` function to continue to the concrete
//! handler.

use crate::fusion::Fusion;
use crate::refs::{ExprRef, StmtRef, ValRef};
use crate::types::{BinaryOpType, ExprKind, TernaryOpType, UnaryOpType, ValNode};

// ============================================================================
// Read-only dispatch
// ============================================================================

pub trait ConstDispatch {
    fn handle_bool(&mut self, fusion: &Fusion, val: ValRef, value: Option<bool>);
    fn handle_double(&mut self, fusion: &Fusion, val: ValRef, value: Option<f64>);
    fn handle_int(&mut self, fusion: &Fusion, val: ValRef, value: Option<i64>);
    fn handle_named_scalar(&mut self, fusion: &Fusion, val: ValRef, name: &str);
    fn handle_tensor_view(&mut self, fusion: &Fusion, val: ValRef, ndims: usize);

    fn handle_unary_op(&mut self, fusion: &Fusion, expr: ExprRef, op: UnaryOpType);
    fn handle_binary_op(&mut self, fusion: &Fusion, expr: ExprRef, op: BinaryOpType);
    fn handle_ternary_op(&mut self, fusion: &Fusion, expr: ExprRef, op: TernaryOpType);

    fn handle_stmt(&mut self, fusion: &Fusion, stmt: StmtRef) {
        route_stmt(self, fusion, stmt);
    }

    fn handle_val(&mut self, fusion: &Fusion, val: ValRef) {
        route_val(self, fusion, val);
    }

    fn handle_expr(&mut self, fusion: &Fusion, expr: ExprRef) {
        route_expr(self, fusion, expr);
    }
}

/// Send `stmt` to `handle_val` or `handle_expr`.
pub fn route_stmt<D: ConstDispatch + ?Sized>(d: &mut D, fusion: &Fusion, stmt: StmtRef) {
    match stmt {
        StmtRef::Val(v) => d.handle_val(fusion, v),
        StmtRef::Expr(e) => d.handle_expr(fusion, e),
    }
}

/// Send `val` to the handler of its concrete kind.
///
/// # Panics
///
/// Panics if `val` belongs to another fusion.
pub fn route_val<D: ConstDispatch + ?Sized>(d: &mut D, fusion: &Fusion, val: ValRef) {
    match fusion.val(val).node() {
        ValNode::Bool(value) => d.handle_bool(fusion, val, *value),
        ValNode::Double(value) => d.handle_double(fusion, val, *value),
        ValNode::Int(value) => d.handle_int(fusion, val, *value),
        ValNode::NamedScalar(name) => d.handle_named_scalar(fusion, val, name),
        ValNode::TensorView { ndims } => d.handle_tensor_view(fusion, val, *ndims),
    }
}

/// Send `expr` to the handler of its concrete kind.
///
/// # Panics
///
/// Panics if `expr` belongs to another fusion.
pub fn route_expr<D: ConstDispatch + ?Sized>(d: &mut D, fusion: &Fusion, expr: ExprRef) {
    match fusion.expr(expr).kind() {
        ExprKind::Unary(op) => d.handle_unary_op(fusion, expr, op),
        ExprKind::Binary(op) => d.handle_binary_op(fusion, expr, op),
        ExprKind::Ternary(op) => d.handle_ternary_op(fusion, expr, op),
    }
}

// ============================================================================
// Mutating dispatch
// ============================================================================

/// Dispatch for operations that mutate the fusion.
///
/// Value handlers receive only the handle; the payload is read back from the
/// fusion when needed, since the handler holds it mutably.
pub trait MutDispatch {
    fn mutate_bool(&mut self, fusion: &mut Fusion, val: ValRef);
    fn mutate_double(&mut self, fusion: &mut Fusion, val: ValRef);
    fn mutate_int(&mut self, fusion: &mut Fusion, val: ValRef);
    fn mutate_named_scalar(&mut self, fusion: &mut Fusion, val: ValRef);
    fn mutate_tensor_view(&mut self, fusion: &mut Fusion, val: ValRef);

    fn mutate_unary_op(&mut self, fusion: &mut Fusion, expr: ExprRef, op: UnaryOpType);
    fn mutate_binary_op(&mut self, fusion: &mut Fusion, expr: ExprRef, op: BinaryOpType);
    fn mutate_ternary_op(&mut self, fusion: &mut Fusion, expr: ExprRef, op: TernaryOpType);

    fn mutate_stmt(&mut self, fusion: &mut Fusion, stmt: StmtRef) {
        route_stmt_mut(self, fusion, stmt);
    }

    fn mutate_val(&mut self, fusion: &mut Fusion, val: ValRef) {
        route_val_mut(self, fusion, val);
    }

    fn mutate_expr(&mut self, fusion: &mut Fusion, expr: ExprRef) {
        route_expr_mut(self, fusion, expr);
    }
}

pub fn route_stmt_mut<D: MutDispatch + ?Sized>(d: &mut D, fusion: &mut Fusion, stmt: StmtRef) {
    match stmt {
        StmtRef::Val(v) => d.mutate_val(fusion, v),
        StmtRef::Expr(e) => d.mutate_expr(fusion, e),
    }
}

pub fn route_val_mut<D: MutDispatch + ?Sized>(d: &mut D, fusion: &mut Fusion, val: ValRef) {
    match fusion.val(val).node() {
        ValNode::Bool(_) => d.mutate_bool(fusion, val),
        ValNode::Double(_) => d.mutate_double(fusion, val),
        ValNode::Int(_) => d.mutate_int(fusion, val),
        ValNode::NamedScalar(_) => d.mutate_named_scalar(fusion, val),
        ValNode::TensorView { .. } => d.mutate_tensor_view(fusion, val),
    }
}

pub fn route_expr_mut<D: MutDispatch + ?Sized>(d: &mut D, fusion: &mut Fusion, expr: ExprRef) {
    match fusion.expr(expr).kind() {
        ExprKind::Unary(op) => d.mutate_unary_op(fusion, expr, op),
        ExprKind::Binary(op) => d.mutate_binary_op(fusion, expr, op),
        ExprKind::Ternary(op) => d.mutate_ternary_op(fusion, expr, op),
    }
}
