//! Entity references for the fusion arena.
//!
//! `ValId` and `ExprId` are thin `u32` wrappers indexing the `PrimaryMap`
//! storage inside a [`Fusion`](crate::Fusion). The public handles
//! ([`ValRef`], [`ExprRef`]) additionally carry the [`FusionId`] of their
//! owner, so a handle used with the wrong fusion is caught instead of
//! silently aliasing an unrelated node.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use cranelift_entity::entity_impl;
use derive_more::{Display, From};

/// Identity of one owning [`Fusion`](crate::Fusion).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("fusion{_0}")]
pub struct FusionId(u32);

impl FusionId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        FusionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Arena index of a value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValId(u32);
entity_impl!(ValId, "val");

/// Arena index of an expression.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);
entity_impl!(ExprId, "expr");

/// Handle to a `Val` owned by a particular fusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValRef {
    pub(crate) owner: FusionId,
    pub(crate) id: ValId,
}

impl ValRef {
    pub fn owner(self) -> FusionId {
        self.owner
    }

    pub fn id(self) -> ValId {
        self.id
    }
}

impl fmt::Display for ValRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

/// Handle to an `Expr` owned by a particular fusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprRef {
    pub(crate) owner: FusionId,
    pub(crate) id: ExprId,
}

impl ExprRef {
    pub fn owner(self) -> FusionId {
        self.owner
    }

    pub fn id(self) -> ExprId {
        self.id
    }
}

impl fmt::Display for ExprRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

/// Any IR node: either a value or an expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub enum StmtRef {
    Val(ValRef),
    Expr(ExprRef),
}

/// Identity assigned to a statement when it is registered with its fusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct StmtName(pub(crate) u32);

impl StmtName {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_entity::EntityRef;

    #[test]
    fn fusion_ids_are_distinct() {
        let a = FusionId::fresh();
        let b = FusionId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn handle_display() {
        let owner = FusionId::fresh();
        let v = ValRef {
            owner,
            id: ValId::new(3),
        };
        let e = ExprRef {
            owner,
            id: ExprId::new(1),
        };
        assert_eq!(format!("{v}"), "val3");
        assert_eq!(format!("{e}"), "expr1");
        assert_eq!(format!("{}", StmtRef::from(v)), "val3");
        assert_eq!(format!("{}", StmtName(7)), "7");
    }
}
