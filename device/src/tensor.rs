//! Host-side tensor values.
//!
//! [`Tensor`] carries exactly what the dispatch cache inspects (element type,
//! device, sizes, strides, dispatch keys) plus an opaque shared byte buffer
//! that runners read and write. It performs no arithmetic.

use std::sync::Arc;

use kiln_dtype::{Device, HasDType, Scalar, ScalarDType};
use smallvec::SmallVec;
use snafu::ensure;

use crate::dispatch_key::{DispatchKeySet, device_key_set};
use crate::error::{NotAScalarSnafu, RankMismatchSnafu, Result, SizeMismatchSnafu, UndecodableDTypeSnafu};

/// Per-dimension extents or strides (stack-allocated for 0-4D tensors).
pub type Dims = SmallVec<[i64; 4]>;

#[derive(Debug, Clone)]
pub struct Tensor {
    dtype: ScalarDType,
    device: Device,
    sizes: Dims,
    strides: Dims,
    /// Keys layered on top of the device's default key set (e.g. `Python`).
    extra_keys: DispatchKeySet,
    data: Arc<[u8]>,
}

/// Row-major strides for `sizes`.
pub fn contiguous_strides(sizes: &[i64]) -> Dims {
    let mut strides: Dims = smallvec::smallvec![1; sizes.len()];
    for dim in (0..sizes.len().saturating_sub(1)).rev() {
        strides[dim] = strides[dim + 1] * sizes[dim + 1].max(1);
    }
    strides
}

fn numel_of(sizes: &[i64]) -> usize {
    sizes.iter().map(|&s| s.max(0) as usize).product()
}

impl Tensor {
    /// Build a contiguous tensor from raw native-endian bytes.
    pub fn from_bytes(dtype: ScalarDType, sizes: &[i64], device: Device, data: Arc<[u8]>) -> Result<Self> {
        let expected = numel_of(sizes) * dtype.bytes();
        ensure!(data.len() == expected, SizeMismatchSnafu { expected, actual: data.len() });
        Ok(Self {
            dtype,
            device,
            sizes: Dims::from_slice(sizes),
            strides: contiguous_strides(sizes),
            extra_keys: DispatchKeySet::empty(),
            data,
        })
    }

    /// Build a contiguous tensor from native values.
    pub fn from_vec<T: HasDType>(values: Vec<T>, sizes: &[i64], device: Device) -> Result<Self> {
        let mut bytes = Vec::with_capacity(values.len() * T::DTYPE.bytes());
        for value in values {
            value.extend_ne_bytes(&mut bytes);
        }
        Self::from_bytes(T::DTYPE, sizes, device, Arc::from(bytes))
    }

    pub fn zeros(dtype: ScalarDType, sizes: &[i64], device: Device) -> Self {
        let data: Arc<[u8]> = Arc::from(vec![0u8; numel_of(sizes) * dtype.bytes()]);
        Self {
            dtype,
            device,
            sizes: Dims::from_slice(sizes),
            strides: contiguous_strides(sizes),
            extra_keys: DispatchKeySet::empty(),
            data,
        }
    }

    /// Materialize a bare scalar as a zero-dimensional tensor of its native type.
    pub fn scalar(value: Scalar, device: Device) -> Self {
        let mut bytes = Vec::with_capacity(value.dtype().bytes());
        match value {
            Scalar::Bool(v) => bytes.push(v as u8),
            Scalar::Int(v) => bytes.extend_from_slice(&v.to_ne_bytes()),
            Scalar::UInt(v) => bytes.extend_from_slice(&v.to_ne_bytes()),
            Scalar::Float(v) => bytes.extend_from_slice(&v.to_ne_bytes()),
            Scalar::Complex { re, im } => {
                bytes.extend_from_slice(&re.to_ne_bytes());
                bytes.extend_from_slice(&im.to_ne_bytes());
            }
        }
        Self {
            dtype: value.dtype(),
            device,
            sizes: Dims::new(),
            strides: Dims::new(),
            extra_keys: DispatchKeySet::empty(),
            data: Arc::from(bytes),
        }
    }

    /// Reinterpret the same storage with different strides.
    pub fn with_strides(mut self, strides: &[i64]) -> Result<Self> {
        ensure!(
            strides.len() == self.sizes.len(),
            RankMismatchSnafu { sizes: self.sizes.len(), strides: strides.len() }
        );
        self.strides = Dims::from_slice(strides);
        Ok(self)
    }

    pub fn with_extra_keys(mut self, keys: DispatchKeySet) -> Self {
        self.extra_keys |= keys;
        self
    }

    pub fn dtype(&self) -> ScalarDType {
        self.dtype
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    pub fn strides(&self) -> &[i64] {
        &self.strides
    }

    pub fn dim(&self) -> usize {
        self.sizes.len()
    }

    pub fn numel(&self) -> usize {
        numel_of(&self.sizes)
    }

    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// Dispatch keys this tensor contributes to a call.
    pub fn key_set(&self) -> DispatchKeySet {
        device_key_set(self.device.kind) | self.extra_keys
    }

    /// Whether two handles share the same storage.
    pub fn is_same(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Read the single element of a one-element tensor.
    pub fn item(&self) -> Result<Scalar> {
        ensure!(self.numel() == 1, NotAScalarSnafu { numel: self.numel() });
        let bytes = &self.data[..self.dtype.bytes()];
        let value = match self.dtype {
            ScalarDType::Bool => Scalar::Bool(bytes[0] != 0),
            ScalarDType::UInt8 => Scalar::UInt(bytes[0] as u64),
            ScalarDType::Int8 => Scalar::Int(bytes[0] as i8 as i64),
            ScalarDType::Int16 => Scalar::Int(i16::from_ne_bytes(ne_array(bytes, self.dtype)?) as i64),
            ScalarDType::Int32 => Scalar::Int(i32::from_ne_bytes(ne_array(bytes, self.dtype)?) as i64),
            ScalarDType::Int64 => Scalar::Int(i64::from_ne_bytes(ne_array(bytes, self.dtype)?)),
            ScalarDType::UInt64 => Scalar::UInt(u64::from_ne_bytes(ne_array(bytes, self.dtype)?)),
            ScalarDType::Float16 => Scalar::Float(half::f16::from_ne_bytes(ne_array(bytes, self.dtype)?).to_f64()),
            ScalarDType::BFloat16 => Scalar::Float(half::bf16::from_ne_bytes(ne_array(bytes, self.dtype)?).to_f64()),
            ScalarDType::Float32 => Scalar::Float(f32::from_ne_bytes(ne_array(bytes, self.dtype)?) as f64),
            ScalarDType::Float64 => Scalar::Float(f64::from_ne_bytes(ne_array(bytes, self.dtype)?)),
            ScalarDType::Complex64 => Scalar::Complex {
                re: f32::from_ne_bytes(ne_array(&bytes[..4], self.dtype)?) as f64,
                im: f32::from_ne_bytes(ne_array(&bytes[4..], self.dtype)?) as f64,
            },
            ScalarDType::Complex128 => Scalar::Complex {
                re: f64::from_ne_bytes(ne_array(&bytes[..8], self.dtype)?),
                im: f64::from_ne_bytes(ne_array(&bytes[8..], self.dtype)?),
            },
        };
        Ok(value)
    }
}

fn ne_array<const N: usize>(bytes: &[u8], dtype: ScalarDType) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| UndecodableDTypeSnafu { dtype }.build())
}
