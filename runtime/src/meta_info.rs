//! Cache keys: per-input metadata and the ordered key over all inputs.
//!
//! Call-time keys ([`TensorMetaInfo::from_tensor`]) and keys rebuilt from the
//! persisted store ([`TensorMetaInfo::from_descriptor`]) share
//! [`promote_scalar`], so the same logical input always yields the same key.

use std::hash::{Hash, Hasher};

use kiln_device::Tensor;
use kiln_dtype::{Device, DeviceType, Scalar, ScalarDType};
use smallvec::SmallVec;
use snafu::{OptionExt, ResultExt, ensure};

use crate::error::{
    DTypeSnafu, DescriptorRankSnafu, DeviceIndexSnafu, DeviceSnafu, Result, ScalarLiteralSnafu,
    UnsupportedScalarKindSnafu,
};
use crate::normalize::NormalizedArgs;
use crate::schema::{ArgType, Argument};
use crate::store::TensorDescriptor;

/// One size or stride: a static extent or "any".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymDim {
    Static(i64),
    Dynamic,
}

impl SymDim {
    pub const fn as_static(self) -> Option<i64> {
        match self {
            Self::Static(v) => Some(v),
            Self::Dynamic => None,
        }
    }

    /// Whether a cached dimension accepts a probe dimension.
    pub fn admits(self, probe: Self) -> bool {
        match self {
            Self::Dynamic => true,
            Self::Static(_) => self == probe,
        }
    }
}

impl From<Option<i64>> for SymDim {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Dynamic, Self::Static)
    }
}

pub type SymDims = SmallVec<[SymDim; 4]>;

/// Promoted literal of a scalar argument.
#[derive(Debug, Clone, Copy)]
pub enum ScalarLiteral {
    Float(f64),
    UInt(u64),
    Bool(bool),
}

impl PartialEq for ScalarLiteral {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarLiteral {}

impl Hash for ScalarLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Float(v) => v.to_bits().hash(state),
            Self::UInt(v) => v.hash(state),
            Self::Bool(v) => v.hash(state),
        }
    }
}

/// Key dtype a scalar of `dtype` is promoted to, or `None` for unsupported kinds.
pub const fn promoted_dtype(dtype: ScalarDType) -> Option<ScalarDType> {
    if dtype.is_float() {
        Some(ScalarDType::Float64)
    } else if dtype.is_int() {
        Some(ScalarDType::UInt64)
    } else if dtype.is_bool() {
        Some(ScalarDType::Bool)
    } else {
        None
    }
}

/// Promote a scalar of element type `dtype` to its key dtype and literal.
///
/// Floats widen to `float64`, integers reinterpret as `uint64` (negative
/// values wrap), bools stay `bool`. Complex scalars are rejected.
pub fn promote_scalar(dtype: ScalarDType, value: Scalar) -> Result<(ScalarDType, ScalarLiteral)> {
    let promoted = promoted_dtype(dtype).context(UnsupportedScalarKindSnafu { dtype })?;
    let literal = match promoted {
        ScalarDType::Float64 => value.to_f64().map(ScalarLiteral::Float),
        ScalarDType::UInt64 => value.to_u64_wrapping().map(ScalarLiteral::UInt),
        _ => value.to_bool().map(ScalarLiteral::Bool),
    };
    let literal = literal.with_context(|| ScalarLiteralSnafu { dtype, literal: format!("{value:?}") })?;
    Ok((promoted, literal))
}

/// Metadata of one kernel input.
///
/// Equality and hashing cover exactly the fields below.
#[derive(Debug, Clone)]
pub struct TensorMetaInfo {
    pub is_dynamic: bool,
    pub dtype: ScalarDType,
    /// Present only for bare-scalar arguments.
    pub scalar_value: Option<ScalarLiteral>,
    /// CPU ordinals are collapsed.
    pub device: Device,
    pub sizes: SymDims,
    pub strides: SymDims,
}

impl TensorMetaInfo {
    /// Key for a live input whose formal argument has type `formal`.
    pub fn from_tensor(tensor: &Tensor, formal: &ArgType) -> Result<Self> {
        let (dtype, scalar_value) = if formal.is_number() {
            let value = tensor.item().context(DeviceSnafu)?;
            let (dtype, literal) = promote_scalar(tensor.dtype(), value)?;
            (dtype, Some(literal))
        } else {
            (tensor.dtype(), None)
        };

        Ok(Self {
            is_dynamic: false,
            dtype,
            scalar_value,
            device: tensor.device().normalized(),
            sizes: tensor.sizes().iter().map(|&s| SymDim::Static(s)).collect(),
            strides: tensor.strides().iter().map(|&s| SymDim::Static(s)).collect(),
        })
    }

    /// Rebuild a key from its persisted descriptor.
    pub fn from_descriptor(desc: &TensorDescriptor) -> Result<Self> {
        let dtype = ScalarDType::from_qualified_name(&desc.dtype).context(DTypeSnafu)?;
        let kind = DeviceType::parse(&desc.device_type).context(DTypeSnafu)?;
        let device =
            Device::from_raw_index(kind, desc.device_index).context(DeviceIndexSnafu { index: desc.device_index })?;
        ensure!(
            desc.sizes.len() == desc.strides.len(),
            DescriptorRankSnafu { sizes: desc.sizes.len(), strides: desc.strides.len() }
        );

        let (dtype, scalar_value) = match desc.scalar_value {
            Some(literal) => {
                let (dtype, literal) = promote_scalar(dtype, literal.into())?;
                (dtype, Some(literal))
            }
            None => (dtype, None),
        };

        Ok(Self {
            is_dynamic: desc.is_dynamic,
            dtype,
            scalar_value,
            device: device.normalized(),
            sizes: desc.sizes.iter().copied().map(SymDim::from).collect(),
            strides: desc.strides.iter().copied().map(SymDim::from).collect(),
        })
    }

    /// Whether every dimension is static and the entry is not flagged dynamic.
    pub fn is_static(&self) -> bool {
        !self.is_dynamic && self.sizes.iter().chain(&self.strides).all(|d| matches!(d, SymDim::Static(_)))
    }

    /// Whether this (possibly dynamic) cached key accepts a call-time `probe`.
    pub fn admits(&self, probe: &TensorMetaInfo) -> bool {
        self.dtype == probe.dtype
            && self.scalar_value == probe.scalar_value
            && self.device == probe.device
            && self.sizes.len() == probe.sizes.len()
            && self.strides.len() == probe.strides.len()
            && self.sizes.iter().zip(&probe.sizes).all(|(c, p)| c.admits(*p))
            && self.strides.iter().zip(&probe.strides).all(|(c, p)| c.admits(*p))
    }
}

impl PartialEq for TensorMetaInfo {
    fn eq(&self, other: &Self) -> bool {
        self.is_dynamic == other.is_dynamic
            && self.dtype == other.dtype
            && self.scalar_value == other.scalar_value
            && self.device == other.device
            && self.sizes == other.sizes
            && self.strides == other.strides
    }
}

impl Eq for TensorMetaInfo {}

impl Hash for TensorMetaInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_dynamic.hash(state);
        self.dtype.hash(state);
        self.scalar_value.hash(state);
        self.device.hash(state);
        self.sizes.hash(state);
        self.strides.hash(state);
    }
}

/// Full cache key: one [`TensorMetaInfo`] per kernel input, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KernelMetaInfo(pub Vec<TensorMetaInfo>);

impl KernelMetaInfo {
    /// Key for normalized call inputs; `arguments` classifies each input by its slot.
    pub fn from_inputs(inputs: &NormalizedArgs, arguments: &[Argument]) -> Result<Self> {
        inputs
            .iter()
            .map(|(slot, tensor)| TensorMetaInfo::from_tensor(tensor, &arguments[slot].ty))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_static(&self) -> bool {
        self.0.iter().all(TensorMetaInfo::is_static)
    }

    pub fn admits(&self, probe: &KernelMetaInfo) -> bool {
        self.0.len() == probe.0.len() && self.0.iter().zip(&probe.0).all(|(c, p)| c.admits(p))
    }
}
