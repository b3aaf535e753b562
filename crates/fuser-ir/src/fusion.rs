//! Fusion: arena-based owning context for IR nodes.
//!
//! All values and expressions live in `PrimaryMap`s owned by a [`Fusion`].
//! Nodes refer to each other through owner-tagged handles, never through
//! pointers, so the producer/consumer back-references can be rewritten or
//! rebuilt by the fusion without any node holding a borrow.
//!
//! Use lists of scalar values are maintained eagerly on registration. Use
//! lists of tensor values are a derived cache: they are rebuilt from the
//! expressions reachable from the fusion outputs whenever the cache has been
//! invalidated (see [`Fusion::uses`]).

use std::collections::HashSet;

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::errors::{IrError, IrResult};
use crate::refs::{ExprId, ExprRef, FusionId, StmtName, StmtRef, ValId, ValRef};
use crate::types::{DataType, ExprKind, ExprType, ValNode, ValType};

// ============================================================================
// Entity data types
// ============================================================================

/// Data for a single value in the arena.
#[derive(Clone, Debug)]
pub struct ValData {
    pub(crate) name: Option<StmtName>,
    pub(crate) owner: FusionId,
    pub(crate) node: ValNode,
    pub(crate) dtype: Option<DataType>,
    pub(crate) is_fusion_input: bool,
    pub(crate) is_fusion_output: bool,
    pub(crate) definition: Option<ExprRef>,
    pub(crate) uses: SmallVec<[ExprRef; 2]>,
}

impl ValData {
    /// Identity assigned at registration, if registered.
    pub fn name(&self) -> Option<StmtName> {
        self.name
    }

    pub fn owner(&self) -> FusionId {
        self.owner
    }

    pub fn node(&self) -> &ValNode {
        &self.node
    }

    pub fn val_type(&self) -> ValType {
        self.node.val_type()
    }

    /// Raw data type; `None` when it was never set.
    pub fn dtype(&self) -> Option<DataType> {
        self.dtype
    }

    pub fn is_fusion_input(&self) -> bool {
        self.is_fusion_input
    }

    pub fn is_fusion_output(&self) -> bool {
        self.is_fusion_output
    }

    /// The expression producing this value, if any.
    pub fn definition(&self) -> Option<ExprRef> {
        self.definition
    }
}

/// Data for a single expression in the arena.
#[derive(Clone, Debug)]
pub struct ExprData {
    pub(crate) name: StmtName,
    pub(crate) owner: FusionId,
    pub(crate) kind: ExprKind,
    pub(crate) inputs: SmallVec<[ValRef; 4]>,
    pub(crate) outputs: SmallVec<[ValRef; 2]>,
}

impl ExprData {
    pub fn name(&self) -> StmtName {
        self.name
    }

    pub fn owner(&self) -> FusionId {
        self.owner
    }

    pub fn kind(&self) -> ExprKind {
        self.kind
    }

    pub fn expr_type(&self) -> ExprType {
        self.kind.expr_type()
    }

    pub fn inputs(&self) -> &[ValRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValRef] {
        &self.outputs
    }

    pub fn input(&self, index: usize) -> ValRef {
        self.inputs[index]
    }

    pub fn output(&self, index: usize) -> ValRef {
        self.outputs[index]
    }
}

// ============================================================================
// Fusion
// ============================================================================

/// Owning context of one compute graph.
///
/// Allocates, names and owns every [`ValData`] and [`ExprData`]; nodes die
/// with their fusion. Handles from another fusion are rejected.
pub struct Fusion {
    id: FusionId,
    pub(crate) vals: PrimaryMap<ValId, ValData>,
    pub(crate) exprs: PrimaryMap<ExprId, ExprData>,
    next_name: u32,

    inputs: Vec<ValRef>,
    outputs: Vec<ValRef>,

    /// Consumer cache state for tensor values.
    all_tv_uses_valid: bool,
    is_during_update_uses: bool,
    tv_use_resets: usize,
}

impl Fusion {
    /// Create a new empty fusion.
    pub fn new() -> Self {
        Self::with_name_counter(0)
    }

    /// Empty fusion whose next assigned identity is `next_name`.
    pub(crate) fn with_name_counter(next_name: u32) -> Self {
        Self {
            id: FusionId::fresh(),
            vals: PrimaryMap::new(),
            exprs: PrimaryMap::new(),
            next_name,
            inputs: Vec::new(),
            outputs: Vec::new(),
            all_tv_uses_valid: true,
            is_during_update_uses: false,
            tv_use_resets: 0,
        }
    }

    pub fn id(&self) -> FusionId {
        self.id
    }

    pub(crate) fn name_counter(&self) -> u32 {
        self.next_name
    }

    fn assign_name(&mut self) -> StmtName {
        let name = StmtName(self.next_name);
        self.next_name += 1;
        name
    }

    /// Check that `stmt` was allocated by this fusion.
    pub fn check_owner(&self, stmt: impl Into<StmtRef>) -> IrResult<()> {
        let stmt = stmt.into();
        let owner = stmt.owner();
        if owner == self.id {
            Ok(())
        } else {
            Err(IrError::ForeignStatement {
                stmt,
                owner,
                expected: self.id,
            })
        }
    }

    pub(crate) fn assert_owned(&self, stmt: impl Into<StmtRef>) {
        if let Err(e) = self.check_owner(stmt) {
            panic!("{e}");
        }
    }

    // ========================================================================
    // Val
    // ========================================================================

    /// Allocate a value.
    ///
    /// With `register` set, the value immediately receives its identity;
    /// otherwise it stays anonymous until [`register_val`](Self::register_val).
    pub fn create_val(&mut self, node: ValNode, dtype: Option<DataType>, register: bool) -> ValRef {
        let name = if register {
            Some(self.assign_name())
        } else {
            None
        };
        let id = self.vals.push(ValData {
            name,
            owner: self.id,
            node,
            dtype,
            is_fusion_input: false,
            is_fusion_output: false,
            definition: None,
            uses: SmallVec::new(),
        });
        let val = ValRef { owner: self.id, id };
        trace!(fusion = %self.id, %val, ?name, "created val");
        val
    }

    pub fn new_bool(&mut self, value: Option<bool>) -> ValRef {
        self.create_val(ValNode::Bool(value), Some(DataType::Bool), true)
    }

    pub fn new_double(&mut self, value: Option<f64>) -> ValRef {
        self.create_val(ValNode::Double(value), Some(DataType::Double), true)
    }

    pub fn new_int(&mut self, value: Option<i64>) -> ValRef {
        self.create_val(ValNode::Int(value), Some(DataType::Int), true)
    }

    pub fn new_named_scalar(&mut self, name: impl Into<String>, dtype: DataType) -> ValRef {
        self.create_val(ValNode::NamedScalar(name.into()), Some(dtype), true)
    }

    pub fn new_tensor(&mut self, ndims: usize, dtype: DataType) -> ValRef {
        self.create_val(ValNode::TensorView { ndims }, Some(dtype), true)
    }

    /// Assign an identity to `val`. Registering twice returns the same name.
    pub fn register_val(&mut self, val: ValRef) -> StmtName {
        self.assert_owned(val);
        if let Some(name) = self.vals[val.id].name {
            return name;
        }
        let name = self.assign_name();
        self.vals[val.id].name = Some(name);
        trace!(fusion = %self.id, %val, %name, "registered val");
        name
    }

    pub fn try_val(&self, val: ValRef) -> IrResult<&ValData> {
        self.check_owner(val)?;
        Ok(&self.vals[val.id])
    }

    /// Get immutable reference to value data.
    ///
    /// # Panics
    ///
    /// Panics if `val` belongs to another fusion.
    pub fn val(&self, val: ValRef) -> &ValData {
        self.try_val(val).unwrap_or_else(|e| panic!("{e}"))
    }

    /// All values in allocation order.
    pub fn vals(&self) -> impl Iterator<Item = ValRef> + '_ {
        let owner = self.id;
        self.vals.keys().map(move |id| ValRef { owner, id })
    }

    pub fn definition(&self, val: ValRef) -> Option<ExprRef> {
        self.val(val).definition
    }

    fn add_use(&mut self, val: ValRef, expr: ExprRef) {
        let uses = &mut self.vals[val.id].uses;
        if !uses.contains(&expr) {
            uses.push(expr);
        }
    }

    // ========================================================================
    // Expr
    // ========================================================================

    /// Register a fully wired expression. Called by `ExprBuilder::build`.
    ///
    /// Only direct self-loops are rejected. An output may still feed one of
    /// the inputs' producers, so cyclic graphs are representable; the walks
    /// over the graph (`exprs`, `same_as`, `ConstCheck`) all terminate on them.
    pub(crate) fn register_expr(
        &mut self,
        kind: ExprKind,
        inputs: SmallVec<[ValRef; 4]>,
        outputs: SmallVec<[ValRef; 2]>,
    ) -> ExprRef {
        for &v in inputs.iter().chain(outputs.iter()) {
            self.assert_owned(v);
        }
        let expr_type = kind.expr_type();
        assert_eq!(
            inputs.len(),
            expr_type.arity(),
            "{expr_type} expects {} input(s), got {}",
            expr_type.arity(),
            inputs.len(),
        );
        for &out in &outputs {
            if let Some(existing) = self.vals[out.id].definition {
                panic!(
                    "{out} is already defined by {existing}; \
                     a value can only be produced by one expression",
                );
            }
            assert!(
                !inputs.contains(&out),
                "{out} cannot be both an input and an output of the same expression",
            );
        }

        let name = self.assign_name();
        let id = self.exprs.push(ExprData {
            name,
            owner: self.id,
            kind,
            inputs,
            outputs,
        });
        let expr = ExprRef { owner: self.id, id };

        for i in 0..self.exprs[id].outputs.len() {
            let out = self.exprs[id].outputs[i];
            self.vals[out.id].definition = Some(expr);
        }
        let mut reads_tensor = false;
        for i in 0..self.exprs[id].inputs.len() {
            let input = self.exprs[id].inputs[i];
            self.add_use(input, expr);
            reads_tensor |= self.vals[input.id].val_type() == ValType::TensorView;
        }
        // Whether the new reader is live is only known on the next rebuild.
        if reads_tensor {
            self.invalidate_tv_uses();
        }

        trace!(fusion = %self.id, %expr, ?kind, %name, "registered expr");
        expr
    }

    pub fn try_expr(&self, expr: ExprRef) -> IrResult<&ExprData> {
        self.check_owner(expr)?;
        Ok(&self.exprs[expr.id])
    }

    /// Get immutable reference to expression data.
    ///
    /// # Panics
    ///
    /// Panics if `expr` belongs to another fusion.
    pub fn expr(&self, expr: ExprRef) -> &ExprData {
        self.try_expr(expr).unwrap_or_else(|e| panic!("{e}"))
    }

    /// All registered expressions in registration order, live or not.
    pub fn all_exprs(&self) -> impl Iterator<Item = ExprRef> + '_ {
        let owner = self.id;
        self.exprs.keys().map(move |id| ExprRef { owner, id })
    }

    /// Expressions contributing to the fusion outputs, producers first.
    pub fn exprs(&self) -> Vec<ExprRef> {
        let mut order = Vec::new();
        let mut done: HashSet<ExprRef> = HashSet::new();
        let mut on_stack: HashSet<ExprRef> = HashSet::new();
        let mut stack: Vec<(ExprRef, bool)> = Vec::new();

        for &out in self.outputs.iter().rev() {
            if let Some(def) = self.vals[out.id].definition {
                stack.push((def, false));
            }
        }

        while let Some((expr, expanded)) = stack.pop() {
            if expanded {
                on_stack.remove(&expr);
                if done.insert(expr) {
                    order.push(expr);
                }
                continue;
            }
            if done.contains(&expr) || !on_stack.insert(expr) {
                continue;
            }
            stack.push((expr, true));
            for &input in self.exprs[expr.id].inputs.iter().rev() {
                if let Some(def) = self.vals[input.id].definition {
                    if !done.contains(&def) && !on_stack.contains(&def) {
                        stack.push((def, false));
                    }
                }
            }
        }

        order
    }

    /// Replace the kind and inputs of `expr` in place, keeping its outputs.
    ///
    /// Use lists are updated and the tensor use cache is invalidated. As with
    /// registration, only an input that is one of the expression's own
    /// outputs is rejected; a rewrite may close a longer cycle.
    ///
    /// # Panics
    ///
    /// Panics if any handle belongs to another fusion, if the input count does
    /// not match `kind`, or if an input is one of the expression's outputs.
    pub fn rewrite_expr(
        &mut self,
        expr: ExprRef,
        kind: ExprKind,
        inputs: impl IntoIterator<Item = ValRef>,
    ) {
        self.assert_owned(expr);
        let inputs: SmallVec<[ValRef; 4]> = inputs.into_iter().collect();
        let expr_type = kind.expr_type();
        assert_eq!(
            inputs.len(),
            expr_type.arity(),
            "{expr_type} expects {} input(s), got {}",
            expr_type.arity(),
            inputs.len(),
        );
        for &v in &inputs {
            self.assert_owned(v);
            assert!(
                !self.exprs[expr.id].outputs.contains(&v),
                "{v} cannot be both an input and an output of {expr}",
            );
        }

        let data = &mut self.exprs[expr.id];
        data.kind = kind;
        let old_inputs = std::mem::replace(&mut data.inputs, inputs.clone());

        for v in old_inputs {
            if !inputs.contains(&v) {
                self.vals[v.id].uses.retain(|u| *u != expr);
            }
        }
        for &v in &inputs {
            self.add_use(v, expr);
        }
        self.invalidate_tv_uses();
        debug!(fusion = %self.id, %expr, ?kind, "rewrote expr");
    }

    // ========================================================================
    // Graph boundary
    // ========================================================================

    /// Mark `val` as a fusion input.
    ///
    /// # Panics
    ///
    /// Panics if `val` belongs to another fusion or is produced by an
    /// expression.
    pub fn add_input(&mut self, val: ValRef) {
        self.assert_owned(val);
        let data = &mut self.vals[val.id];
        if let Some(def) = data.definition {
            panic!("{val} is produced by {def} and cannot be a fusion input");
        }
        if data.is_fusion_input {
            return;
        }
        data.is_fusion_input = true;
        self.inputs.push(val);
        self.invalidate_tv_uses();
    }

    /// Mark `val` as a fusion output.
    pub fn add_output(&mut self, val: ValRef) {
        self.assert_owned(val);
        let data = &mut self.vals[val.id];
        if data.is_fusion_output {
            return;
        }
        data.is_fusion_output = true;
        self.outputs.push(val);
        self.invalidate_tv_uses();
    }

    pub fn inputs(&self) -> &[ValRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValRef] {
        &self.outputs
    }

    // ========================================================================
    // Tensor use cache
    // ========================================================================

    pub fn is_tv_use_info_valid(&self) -> bool {
        self.all_tv_uses_valid
    }

    pub fn is_updating_tv_use_info(&self) -> bool {
        self.is_during_update_uses
    }

    pub fn invalidate_tv_uses(&mut self) {
        self.all_tv_uses_valid = false;
    }

    /// Number of times the tensor use cache has been rebuilt.
    pub fn tv_use_resets(&self) -> usize {
        self.tv_use_resets
    }

    /// Rebuild the use lists of all tensor values from the live expressions.
    pub fn reset_tv_uses(&mut self) {
        self.is_during_update_uses = true;

        for data in self.vals.values_mut() {
            if data.val_type() == ValType::TensorView {
                data.uses.clear();
            }
        }

        let live = self.exprs();
        for &expr in &live {
            for i in 0..self.exprs[expr.id].inputs.len() {
                let input = self.exprs[expr.id].inputs[i];
                if self.vals[input.id].val_type() == ValType::TensorView {
                    self.add_use(input, expr);
                }
            }
        }

        self.all_tv_uses_valid = true;
        self.is_during_update_uses = false;
        self.tv_use_resets += 1;
        debug!(fusion = %self.id, live_exprs = live.len(), "recomputed tensor uses");
    }

    // ========================================================================
    // Raw insertion (used by the cloner)
    // ========================================================================

    pub(crate) fn insert_val_data(&mut self, mut data: ValData) -> ValRef {
        data.owner = self.id;
        let id = self.vals.push(data);
        ValRef { owner: self.id, id }
    }

    pub(crate) fn insert_expr_data(&mut self, mut data: ExprData) -> ExprRef {
        data.owner = self.id;
        let id = self.exprs.push(data);
        ExprRef { owner: self.id, id }
    }

    pub(crate) fn push_boundary(&mut self, inputs: Vec<ValRef>, outputs: Vec<ValRef>) {
        self.inputs.extend(inputs);
        self.outputs.extend(outputs);
        self.invalidate_tv_uses();
    }
}

impl Default for Fusion {
    fn default() -> Self {
        Self::new()
    }
}
