//! Operations common to values and expressions.

use std::collections::HashSet;

use crate::errors::{IrError, IrResult};
use crate::fusion::{Fusion, ValData};
use crate::refs::{ExprRef, FusionId, StmtName, StmtRef, ValRef};
use crate::types::ValNode;

impl StmtRef {
    pub fn is_val(self) -> bool {
        matches!(self, StmtRef::Val(_))
    }

    pub fn is_expr(self) -> bool {
        matches!(self, StmtRef::Expr(_))
    }

    pub fn owner(self) -> FusionId {
        match self {
            StmtRef::Val(v) => v.owner,
            StmtRef::Expr(e) => e.owner,
        }
    }

    pub fn try_as_val(self) -> IrResult<ValRef> {
        match self {
            StmtRef::Val(v) => Ok(v),
            StmtRef::Expr(_) => Err(IrError::NotAVal { stmt: self }),
        }
    }

    pub fn try_as_expr(self) -> IrResult<ExprRef> {
        match self {
            StmtRef::Expr(e) => Ok(e),
            StmtRef::Val(_) => Err(IrError::NotAnExpr { stmt: self }),
        }
    }

    /// # Panics
    ///
    /// Panics if this is an expression.
    pub fn as_val(self) -> ValRef {
        self.try_as_val().unwrap_or_else(|e| panic!("{e}"))
    }

    /// # Panics
    ///
    /// Panics if this is a value.
    pub fn as_expr(self) -> ExprRef {
        self.try_as_expr().unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Fusion {
    /// Identity of `stmt`; `None` for a value that was never registered.
    pub fn name(&self, stmt: impl Into<StmtRef>) -> Option<StmtName> {
        match stmt.into() {
            StmtRef::Val(v) => self.val(v).name(),
            StmtRef::Expr(e) => Some(self.expr(e).name()),
        }
    }

    /// Structural equivalence of two statements of this fusion.
    pub fn same_as(&self, a: impl Into<StmtRef>, b: impl Into<StmtRef>) -> bool {
        self.same_as_across(a, self, b)
    }

    /// Structural equivalence of `a` in this fusion and `b` in `other`.
    ///
    /// Values are equivalent when they are the same handle, or when their
    /// data types agree and either both are produced at the same output
    /// position of equivalent expressions, or both are leaves that are equal
    /// constants, equal named scalars, or the same node with the same identity.
    /// Across two fusions an unregistered leaf matches an unregistered leaf
    /// with the same node, so a graph and its clone always relate. Expressions
    /// are equivalent when their kinds, input counts and output counts agree
    /// and their inputs are pairwise equivalent.
    ///
    /// # Panics
    ///
    /// Panics if `a` does not belong to this fusion or `b` to `other`.
    pub fn same_as_across(
        &self,
        a: impl Into<StmtRef>,
        other: &Fusion,
        b: impl Into<StmtRef>,
    ) -> bool {
        let (a, b) = (a.into(), b.into());
        self.assert_owned(a);
        other.assert_owned(b);
        let mut cmp = SameAs {
            lhs: self,
            rhs: other,
            assumed: HashSet::new(),
        };
        match (a, b) {
            (StmtRef::Val(a), StmtRef::Val(b)) => cmp.vals(a, b),
            (StmtRef::Expr(a), StmtRef::Expr(b)) => cmp.exprs(a, b),
            _ => false,
        }
    }
}

/// Pairwise comparison state. Expression pairs under comparison are assumed
/// equivalent, which terminates the walk on cyclic graphs.
struct SameAs<'a> {
    lhs: &'a Fusion,
    rhs: &'a Fusion,
    assumed: HashSet<(ExprRef, ExprRef)>,
}

impl SameAs<'_> {
    fn vals(&mut self, a: ValRef, b: ValRef) -> bool {
        if a == b {
            return true;
        }
        let (lhs, rhs) = (self.lhs, self.rhs);
        let (da, db) = (lhs.val(a), rhs.val(b));
        if da.dtype() != db.dtype() {
            return false;
        }
        match (da.definition(), db.definition()) {
            (Some(ea), Some(eb)) => {
                let ia = lhs.expr(ea).outputs().iter().position(|&o| o == a);
                let ib = rhs.expr(eb).outputs().iter().position(|&o| o == b);
                ia == ib && self.exprs(ea, eb)
            }
            (None, None) => leaves_same_as(da, db, lhs.id() != rhs.id()),
            _ => false,
        }
    }

    fn exprs(&mut self, a: ExprRef, b: ExprRef) -> bool {
        if a == b || !self.assumed.insert((a, b)) {
            return true;
        }
        let (lhs, rhs) = (self.lhs, self.rhs);
        let (da, db) = (lhs.expr(a), rhs.expr(b));
        if da.kind() != db.kind()
            || da.inputs().len() != db.inputs().len()
            || da.outputs().len() != db.outputs().len()
        {
            return false;
        }
        da.inputs()
            .iter()
            .zip(db.inputs())
            .all(|(&x, &y)| self.vals(x, y))
    }
}

/// Within one fusion distinct anonymous leaves never match; `across` lifts
/// that for leaves of two different fusions.
fn leaves_same_as(a: &ValData, b: &ValData, across: bool) -> bool {
    match (a.node(), b.node()) {
        (x, y) if x.is_const_literal() || y.is_const_literal() => x == y,
        (ValNode::NamedScalar(x), ValNode::NamedScalar(y)) => x == y,
        (x, y) => x == y && a.name() == b.name() && (across || a.name().is_some()),
    }
}
