//! Deep copy of a fusion graph.
//!
//! Cloning runs in two passes. The first pass copies node payloads into a
//! fresh fusion and records each original/clone pair in a [`CloneMap`]; no
//! edge is copied. [`IrCloner::finish`] then rewrites the definitions, use
//! lists and graph boundary of every clone by looking the originals up in the
//! map, so cyclic references never recurse.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::debug;

use crate::fusion::{ExprData, Fusion, ValData};
use crate::refs::{ExprRef, StmtRef, ValRef};

/// Mapping from original statements to their clones.
#[derive(Clone, Debug, Default)]
pub struct CloneMap {
    map: HashMap<StmtRef, StmtRef>,
}

impl CloneMap {
    pub fn get(&self, stmt: impl Into<StmtRef>) -> Option<StmtRef> {
        self.map.get(&stmt.into()).copied()
    }

    pub fn val(&self, val: ValRef) -> Option<ValRef> {
        self.get(val).map(StmtRef::as_val)
    }

    pub fn expr(&self, expr: ExprRef) -> Option<ExprRef> {
        self.get(expr).map(StmtRef::as_expr)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `(original, clone)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (StmtRef, StmtRef)> + '_ {
        self.map.iter().map(|(&k, &v)| (k, v))
    }
}

/// Copies statements of `src` into a new fusion.
pub struct IrCloner<'src> {
    src: &'src Fusion,
    dst: Fusion,
    clones: CloneMap,
}

impl<'src> IrCloner<'src> {
    pub fn new(src: &'src Fusion) -> Self {
        Self {
            src,
            // Continue the source's name sequence so that names assigned
            // later in the copy never collide with copied names.
            dst: Fusion::with_name_counter(src.name_counter()),
            clones: CloneMap::default(),
        }
    }

    /// The fusion receiving the clones.
    pub fn fusion(&self) -> &Fusion {
        &self.dst
    }

    /// Record `clone` as the image of `original`.
    ///
    /// # Panics
    ///
    /// Panics if `original` is not from the source fusion, `clone` is not from
    /// the destination fusion, or `original` already has a clone.
    pub fn register_clone(&mut self, original: impl Into<StmtRef>, clone: impl Into<StmtRef>) {
        let (original, clone) = (original.into(), clone.into());
        self.src.assert_owned(original);
        self.dst.assert_owned(clone);
        assert_eq!(
            original.is_val(),
            clone.is_val(),
            "{original} and {clone} are not the same kind of statement",
        );
        if let Some(existing) = self.clones.map.insert(original, clone) {
            panic!("{original} is already cloned as {existing}");
        }
    }

    /// Clone `val`, or return its existing clone. Edges are left empty.
    pub fn clone_val(&mut self, val: ValRef) -> ValRef {
        if let Some(existing) = self.clones.val(val) {
            return existing;
        }
        let data = self.src.val(val);
        let copy = self.dst.insert_val_data(ValData {
            name: data.name,
            owner: data.owner,
            node: data.node.clone(),
            dtype: data.dtype,
            is_fusion_input: data.is_fusion_input,
            is_fusion_output: data.is_fusion_output,
            definition: None,
            uses: SmallVec::new(),
        });
        self.register_clone(val, copy);
        copy
    }

    /// Clone `expr` together with its inputs and outputs, or return its
    /// existing clone.
    pub fn clone_expr(&mut self, expr: ExprRef) -> ExprRef {
        if let Some(existing) = self.clones.expr(expr) {
            return existing;
        }
        let src = self.src;
        let data = src.expr(expr);
        let inputs = data.inputs.iter().map(|&v| self.clone_val(v)).collect();
        let outputs = data.outputs.iter().map(|&v| self.clone_val(v)).collect();
        let copy = self.dst.insert_expr_data(ExprData {
            name: data.name,
            owner: data.owner,
            kind: data.kind,
            inputs,
            outputs,
        });
        self.register_clone(expr, copy);
        copy
    }

    pub fn clone_stmt(&mut self, stmt: StmtRef) -> StmtRef {
        match stmt {
            StmtRef::Val(v) => self.clone_val(v).into(),
            StmtRef::Expr(e) => self.clone_expr(e).into(),
        }
    }

    /// Clone every statement of `stmts`, returning the clones in order.
    pub fn clone(&mut self, stmts: impl IntoIterator<Item = StmtRef>) -> Vec<StmtRef> {
        stmts.into_iter().map(|s| self.clone_stmt(s)).collect()
    }

    /// Resolve the edges of every clone and hand over the new fusion.
    ///
    /// Definitions and uses that point at statements without a clone are
    /// dropped; the graph inputs and outputs of the source carry over when
    /// they were cloned.
    pub fn finish(self) -> (Fusion, CloneMap) {
        let IrCloner {
            src,
            mut dst,
            clones,
        } = self;

        for (original, clone) in clones.iter() {
            let (StmtRef::Val(original), StmtRef::Val(clone)) = (original, clone) else {
                continue;
            };
            let data = src.val(original);
            let definition = data.definition.and_then(|e| clones.expr(e));
            let uses = data.uses.iter().filter_map(|&e| clones.expr(e)).collect();
            let target = &mut dst.vals[clone.id];
            target.definition = definition;
            target.uses = uses;
        }

        let inputs = src.inputs().iter().filter_map(|&v| clones.val(v)).collect();
        let outputs = src.outputs().iter().filter_map(|&v| clones.val(v)).collect();
        dst.push_boundary(inputs, outputs);

        debug!(src = %src.id(), dst = %dst.id(), cloned = clones.len(), "cloned fusion");
        (dst, clones)
    }
}

impl Fusion {
    /// Clone the whole fusion, returning the copy and the clone map.
    pub fn copy(&self) -> (Fusion, CloneMap) {
        let mut cloner = IrCloner::new(self);
        for val in self.vals() {
            cloner.clone_val(val);
        }
        for expr in self.all_exprs() {
            cloner.clone_expr(expr);
        }
        cloner.finish()
    }
}

impl Clone for Fusion {
    fn clone(&self) -> Self {
        self.copy().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BinaryOpType, DataType, UnaryOpType};

    fn sample() -> (Fusion, ValRef, ValRef) {
        let mut fusion = Fusion::new();
        let t = fusion.new_tensor(2, DataType::Float);
        let s = fusion.new_double(Some(2.0));
        fusion.add_input(t);
        let scaled = fusion.binary_op(BinaryOpType::Mul, t, s);
        let out = fusion.unary_op(UnaryOpType::Abs, scaled);
        fusion.add_output(out);
        (fusion, t, out)
    }

    #[test]
    fn copy_maps_every_statement() {
        let (fusion, _, _) = sample();
        let (copy, map) = fusion.copy();

        assert_ne!(copy.id(), fusion.id());
        assert_eq!(map.len(), fusion.vals().count() + fusion.all_exprs().count());
        for val in fusion.vals() {
            let image = map.val(val).unwrap();
            assert_eq!(image.owner(), copy.id());
            assert_eq!(copy.val(image).name(), fusion.val(val).name());
            assert!(fusion.same_as_across(val, &copy, image));
        }
        for expr in fusion.all_exprs() {
            let image = map.expr(expr).unwrap();
            assert!(fusion.same_as_across(expr, &copy, image));
        }
    }

    #[test]
    fn copy_relates_unregistered_values() {
        let mut fusion = Fusion::new();
        let t = fusion.create_val(
            crate::types::ValNode::TensorView { ndims: 1 },
            Some(DataType::Float),
            false,
        );
        fusion.add_input(t);
        let out = fusion.unary_op(UnaryOpType::Neg, t);
        fusion.add_output(out);

        let (copy, map) = fusion.copy();
        let t_image = map.val(t).unwrap();
        assert_eq!(copy.val(t_image).name(), None);
        assert!(fusion.same_as_across(t, &copy, t_image));
        assert!(fusion.same_as_across(out, &copy, map.val(out).unwrap()));
    }

    #[test]
    fn copied_edges_point_at_images() {
        let (fusion, t, out) = sample();
        let (mut copy, map) = fusion.copy();

        let out_image = map.val(out).unwrap();
        let def = copy.definition(out_image).unwrap();
        assert_eq!(Some(def), map.expr(fusion.definition(out).unwrap()));
        for &input in copy.expr(def).inputs() {
            assert_eq!(input.owner(), copy.id());
        }

        let t_image = map.val(t).unwrap();
        assert_eq!(copy.inputs(), &[t_image]);
        assert_eq!(copy.outputs(), &[out_image]);
        let uses = copy.uses(t_image).to_vec();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].owner(), copy.id());
    }

    #[test]
    fn copy_is_independent() {
        let (fusion, t, _) = sample();
        let mut copy = fusion.clone();
        let before = fusion.all_exprs().count();

        let t_image = copy.inputs()[0];
        let extra = copy.unary_op(UnaryOpType::Neg, t_image);
        copy.add_output(extra);

        assert_eq!(fusion.all_exprs().count(), before);
        assert_eq!(fusion.outputs().len(), 1);
        assert_eq!(copy.outputs().len(), 2);
        // Names assigned after the copy continue past the source's names.
        assert!(copy.val(extra).name() > fusion.val(t).name());
    }

    #[test]
    fn partial_clone_drops_unmapped_edges() {
        let mut fusion = Fusion::new();
        let a = fusion.new_int(None);
        let b = fusion.unary_op(UnaryOpType::Neg, a);
        let c = fusion.unary_op(UnaryOpType::Abs, b);
        let abs = fusion.definition(c).unwrap();

        let mut cloner = IrCloner::new(&fusion);
        let images = cloner.clone([StmtRef::from(abs)]);
        let (copy, map) = cloner.finish();

        assert_eq!(images.len(), 1);
        let b_image = map.val(b).unwrap();
        assert_eq!(copy.definition(b_image), None);
        assert!(map.val(a).is_none());
        assert_eq!(copy.definition(map.val(c).unwrap()), Some(images[0].as_expr()));
    }

    #[test]
    fn cloning_twice_returns_the_same_image() {
        let (fusion, t, _) = sample();
        let mut cloner = IrCloner::new(&fusion);
        let first = cloner.clone_val(t);
        let second = cloner.clone_val(t);
        assert_eq!(first, second);
        assert_eq!(cloner.fusion().vals().count(), 1);
    }

    #[test]
    #[should_panic(expected = "is already cloned as")]
    fn duplicate_registration_panics() {
        let (fusion, t, _) = sample();
        let mut cloner = IrCloner::new(&fusion);
        let image = cloner.clone_val(t);
        cloner.register_clone(t, image);
    }
}
