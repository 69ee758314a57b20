//! Per-input compatibility checks between a live tensor and a cached kernel.

use kiln_device::dispatch_key::{BACKEND_KEYS, backend_keys};
use kiln_device::{DispatchKeySet, Tensor};
use kiln_dtype::{DeviceIndex, ScalarDType};
use smallvec::SmallVec;

use crate::meta_info::{TensorMetaInfo, promoted_dtype};

/// Dispatch-key include/exclude state applied to a tensor's own key set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalState {
    included: DispatchKeySet,
    excluded: DispatchKeySet,
}

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a call dispatched under `keys`: backends outside the call are masked.
    pub fn for_call(keys: DispatchKeySet) -> Self {
        Self { included: DispatchKeySet::empty(), excluded: BACKEND_KEYS - backend_keys(keys) }
    }

    pub fn including(mut self, keys: DispatchKeySet) -> Self {
        self.included |= keys;
        self
    }

    pub fn excluding(mut self, keys: DispatchKeySet) -> Self {
        self.excluded |= keys;
        self
    }

    pub fn apply(&self, keys: DispatchKeySet) -> DispatchKeySet {
        (keys | self.included) - self.excluded
    }
}

/// First property a live tensor failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Mismatch {
    DispatchKeys,
    DType,
    DeviceIndex,
    Rank,
    Size,
    Stride,
}

/// Expected properties of one kernel input, captured when the entry was populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorCheck {
    dispatch_keys: DispatchKeySet,
    dtype: ScalarDType,
    /// Scalar inputs arrive as native-width tensors and are compared after promotion.
    scalar: bool,
    device_index: Option<DeviceIndex>,
    sizes: SmallVec<[Option<i64>; 4]>,
    strides: SmallVec<[Option<i64>; 4]>,
}

impl TensorCheck {
    /// Check for the input described by `meta`, owned by a holder dispatched under `dispatch_keys`.
    pub fn new(dispatch_keys: DispatchKeySet, meta: &TensorMetaInfo) -> Self {
        Self {
            dispatch_keys: backend_keys(dispatch_keys),
            dtype: meta.dtype,
            scalar: meta.scalar_value.is_some(),
            device_index: meta.device.normalized().index,
            sizes: meta.sizes.iter().map(|d| d.as_static()).collect(),
            strides: meta.strides.iter().map(|d| d.as_static()).collect(),
        }
    }

    pub fn check(&self, state: &LocalState, tensor: &Tensor) -> bool {
        self.mismatch(state, tensor).is_none()
    }

    pub fn mismatch(&self, state: &LocalState, tensor: &Tensor) -> Option<Mismatch> {
        let dtype = if self.scalar { promoted_dtype(tensor.dtype()) } else { Some(tensor.dtype()) };
        if dtype != Some(self.dtype) {
            return Some(Mismatch::DType);
        }
        if tensor.device().normalized().index != self.device_index {
            return Some(Mismatch::DeviceIndex);
        }
        if backend_keys(state.apply(tensor.key_set())) != self.dispatch_keys {
            return Some(Mismatch::DispatchKeys);
        }
        if tensor.dim() != self.sizes.len() || tensor.strides().len() != self.strides.len() {
            return Some(Mismatch::Rank);
        }
        if !dims_match(&self.sizes, tensor.sizes()) {
            return Some(Mismatch::Size);
        }
        if !dims_match(&self.strides, tensor.strides()) {
            return Some(Mismatch::Stride);
        }
        None
    }
}

fn dims_match(expected: &[Option<i64>], live: &[i64]) -> bool {
    expected.iter().zip(live).all(|(e, l)| e.is_none_or(|e| e == *l))
}
