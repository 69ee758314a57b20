//! Operator call stack values.

use kiln_device::Tensor;
use kiln_dtype::Scalar;

/// A value on the operator call stack.
#[derive(Debug, Clone)]
pub enum IValue {
    None,
    Tensor(Tensor),
    TensorList(Vec<Tensor>),
    OptionalTensorList(Vec<Option<Tensor>>),
    Scalar(Scalar),
    IntList(Vec<i64>),
    Str(String),
}

impl IValue {
    /// Short kind name used in diagnostics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tensor(_) => "tensor",
            Self::TensorList(_) => "tensor list",
            Self::OptionalTensorList(_) => "optional tensor list",
            Self::Scalar(_) => "scalar",
            Self::IntList(_) => "int list",
            Self::Str(_) => "string",
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Self::Tensor(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Tensor> for IValue {
    fn from(value: Tensor) -> Self {
        Self::Tensor(value)
    }
}

impl From<Scalar> for IValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

/// Operator call stack; arguments sit at the top in declaration order.
pub type Stack = Vec<IValue>;

pub trait StackExt {
    /// The top `n` values, oldest first.
    fn last_n(&self, n: usize) -> Option<&[IValue]>;

    /// Replace the top `n` values with `outputs`.
    fn replace_top(&mut self, n: usize, outputs: impl IntoIterator<Item = IValue>);
}

impl StackExt for Stack {
    fn last_n(&self, n: usize) -> Option<&[IValue]> {
        self.len().checked_sub(n).map(|start| &self[start..])
    }

    fn replace_top(&mut self, n: usize, outputs: impl IntoIterator<Item = IValue>) {
        let start = self.len().saturating_sub(n);
        self.truncate(start);
        self.extend(outputs);
    }
}
