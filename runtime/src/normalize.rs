//! Flatten an operator's arguments into the ordered tensor sequence a kernel consumes.

use kiln_device::Tensor;
use kiln_dtype::Device;

use crate::schema::{ArgType, Argument};
use crate::value::IValue;

/// Whether bare scalars are materialized into the output sequence.
///
/// Lookup keys on scalar literals, so it includes them; compiled kernels take
/// scalars as baked-in constants, so execution skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalars {
    Include,
    Skip,
}

/// Ordered input tensors plus, per tensor, the formal argument slot it came from.
#[derive(Debug, Clone, Default)]
pub struct NormalizedArgs {
    pub tensors: Vec<Tensor>,
    pub slots: Vec<usize>,
}

impl NormalizedArgs {
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    fn push(&mut self, slot: usize, tensor: Tensor) {
        self.tensors.push(tensor);
        self.slots.push(slot);
    }

    /// `(slot, tensor)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Tensor)> {
        self.slots.iter().copied().zip(&self.tensors)
    }
}

/// An argument value no kernel can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedInput {
    pub slot: usize,
    pub kind: &'static str,
}

/// Normalize `values` against `arguments`.
///
/// Scalars are materialized as zero-dimensional tensors on `device`. Any value
/// kind other than tensors, tensor lists and scalars fails the whole call,
/// except `None` for an optional tensor formal.
pub fn normalize(
    arguments: &[Argument],
    values: &[IValue],
    device: Device,
    scalars: Scalars,
) -> Result<NormalizedArgs, UnsupportedInput> {
    if arguments.len() != values.len() {
        return Err(UnsupportedInput { slot: arguments.len().min(values.len()), kind: "arity" });
    }

    let mut out = NormalizedArgs::default();
    for (slot, (argument, value)) in arguments.iter().zip(values).enumerate() {
        match value {
            IValue::Tensor(t) => out.push(slot, t.clone()),
            IValue::TensorList(ts) => ts.iter().for_each(|t| out.push(slot, t.clone())),
            IValue::OptionalTensorList(ts) => ts.iter().flatten().for_each(|t| out.push(slot, t.clone())),
            IValue::Scalar(s) => {
                if scalars == Scalars::Include {
                    out.push(slot, Tensor::scalar(*s, device));
                }
            }
            IValue::None if argument.ty == ArgType::OptionalTensor => {}
            IValue::None | IValue::IntList(_) | IValue::Str(_) => {
                return Err(UnsupportedInput { slot, kind: value.kind() });
            }
        }
    }
    Ok(out)
}
