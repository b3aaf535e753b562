//! Canned fusions exercised by the command-line driver and the tests.

use clap::ValueEnum;
use fuser_ir::Fusion;
use fuser_ir::types::{BinaryOpType, DataType, TernaryOpType, UnaryOpType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Sample {
    /// `2 + 3`, fully constant.
    Add,
    /// Thread index arithmetic over launch-time symbols.
    Symbolic,
    /// Elementwise tensor graph with a dead branch.
    Tensor,
    /// Arithmetic identities waiting to be folded.
    Identity,
}

impl Sample {
    pub fn build(self) -> Fusion {
        match self {
            Sample::Add => add(),
            Sample::Symbolic => symbolic(),
            Sample::Tensor => tensor(),
            Sample::Identity => identity(),
        }
    }
}

fn add() -> Fusion {
    let mut fusion = Fusion::new();
    let two = fusion.new_int(Some(2));
    let three = fusion.new_int(Some(3));
    let sum = fusion.binary_op(BinaryOpType::Add, two, three);
    fusion.add_output(sum);
    fusion
}

fn symbolic() -> Fusion {
    let mut fusion = Fusion::new();
    let n = fusion.new_int(None);
    fusion.add_input(n);
    let bid = fusion.new_named_scalar("blockIdx.x", DataType::Int);
    let bdim = fusion.new_named_scalar("blockDim.x", DataType::Int);
    let tid = fusion.new_named_scalar("threadIdx.x", DataType::Int);

    let base = fusion.binary_op(BinaryOpType::Mul, bid, bdim);
    let index = fusion.binary_op(BinaryOpType::Add, base, tid);
    let in_bounds = fusion.binary_op(BinaryOpType::Lt, index, n);
    fusion.add_output(index);
    fusion.add_output(in_bounds);
    fusion
}

fn tensor() -> Fusion {
    let mut fusion = Fusion::new();
    let x = fusion.new_tensor(2, DataType::Float);
    let bias = fusion.new_tensor(1, DataType::Float);
    let scale = fusion.new_double(None);
    fusion.add_input(x);
    fusion.add_input(bias);
    fusion.add_input(scale);

    let scaled = fusion.binary_op(BinaryOpType::Mul, x, scale);
    let shifted = fusion.binary_op(BinaryOpType::Add, scaled, bias);
    let zero = fusion.new_double(Some(0.0));
    let positive = fusion.binary_op(BinaryOpType::Lt, zero, shifted);
    let relu = fusion.ternary_op(TernaryOpType::Where, positive, shifted, zero);
    let _unused = fusion.unary_op(UnaryOpType::Abs, x);
    fusion.add_output(relu);
    fusion
}

fn identity() -> Fusion {
    let mut fusion = Fusion::new();
    let x = fusion.new_int(None);
    let y = fusion.new_int(None);
    fusion.add_input(x);
    fusion.add_input(y);
    let zero = fusion.new_int(Some(0));
    let one = fusion.new_int(Some(1));

    let a = fusion.binary_op(BinaryOpType::Add, x, zero);
    let b = fusion.binary_op(BinaryOpType::Mul, one, a);
    let c = fusion.binary_op(BinaryOpType::CeilDiv, b, one);
    let d = fusion.binary_op(BinaryOpType::Sub, c, y);
    fusion.add_output(d);
    fusion
}
