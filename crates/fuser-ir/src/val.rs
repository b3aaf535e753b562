//! Queries on values.

use crate::const_check::ConstCheck;
use crate::errors::{IrError, IrResult};
use crate::fusion::Fusion;
use crate::refs::{ExprRef, ValRef};
use crate::types::{DataType, ValNode, ValType};

impl Fusion {
    /// Expressions consuming `val`.
    ///
    /// Tensor use lists are a cache: when it has been invalidated, and no
    /// rebuild is already running, it is rebuilt before returning. Scalar use
    /// lists are always current.
    pub fn uses(&mut self, val: ValRef) -> &[ExprRef] {
        self.assert_owned(val);
        if self.vals[val.id].val_type() == ValType::TensorView
            && !self.is_tv_use_info_valid()
            && !self.is_updating_tv_use_info()
        {
            self.reset_tv_uses();
        }
        &self.vals[val.id].uses
    }

    /// Whether `val` is a scalar whose value is fixed at compile time.
    pub fn is_const_scalar(&self, val: ValRef) -> bool {
        if !self.val(val).val_type().is_scalar() {
            return false;
        }
        ConstCheck::is_const(self, val)
    }

    /// Literal integer value of `val`, if it is a constant integer literal.
    pub fn get_int(&self, val: ValRef) -> Option<i64> {
        if !self.is_const_scalar(val) {
            return None;
        }
        let data = self.val(val);
        if !data.dtype().is_some_and(DataType::is_integral) {
            return None;
        }
        match data.node() {
            ValNode::Int(value) => *value,
            _ => None,
        }
    }

    pub fn is_zero_int(&self, val: ValRef) -> bool {
        self.get_int(val) == Some(0)
    }

    pub fn is_one_int(&self, val: ValRef) -> bool {
        self.get_int(val) == Some(1)
    }

    pub fn try_data_type(&self, val: ValRef) -> IrResult<DataType> {
        self.try_val(val)?
            .dtype()
            .ok_or(IrError::MissingDataType { val })
    }

    /// Data type of `val`.
    ///
    /// # Panics
    ///
    /// Panics if the value was created without a data type.
    pub fn data_type(&self, val: ValRef) -> DataType {
        self.try_data_type(val).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Whether `val` is an input of the expression producing `other`.
    ///
    /// # Panics
    ///
    /// Panics if the two values do not belong to this fusion.
    pub fn is_producer_of(&self, val: ValRef, other: ValRef) -> bool {
        assert!(
            val.owner() == other.owner(),
            "Cannot relate {val} and {other}: they belong to {} and {}",
            val.owner(),
            other.owner(),
        );
        self.assert_owned(val);
        match self.val(other).definition() {
            Some(def) => self.expr(def).inputs().contains(&val),
            None => false,
        }
    }

    /// Whether the expression producing `val` reads `other`.
    pub fn is_consumer_of(&self, val: ValRef, other: ValRef) -> bool {
        self.is_producer_of(other, val)
    }
}
