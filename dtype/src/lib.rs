//! Scalar element types, scalar literals and device descriptors.
//!
//! These are the leaf value types shared by the device layer and the dispatch
//! cache. Nothing here allocates device memory or performs tensor math.

use std::str::FromStr;

pub mod device;
pub mod error;
pub mod ext;
pub mod scalar;


pub use device::{Device, DeviceIndex, DeviceType};
pub use error::{Error, Result};
pub use ext::HasDType;
pub use scalar::Scalar;

/// Scalar element types understood by the dispatch cache.
///
/// The lowercase variant names (`float32`, `bfloat16`, `complex64`, ...) are the
/// persisted vocabulary; see [`ScalarDType::from_qualified_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::FromRepr)]
#[derive(strum::Display, strum::EnumString, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScalarDType {
    Bool = 0,

    UInt8 = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    UInt64 = 6,

    Float16 = 7,
    BFloat16 = 8,
    Float32 = 9,
    Float64 = 10,

    Complex64 = 11,
    Complex128 = 12,
}

impl ScalarDType {
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::UInt8 => 1,
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int32 => 4,
            Self::Int64 => 8,
            Self::UInt64 => 8,
            Self::Float16 => 2,
            Self::BFloat16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
            Self::Complex64 => 8,
            Self::Complex128 => 16,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt64)
    }

    /// Integral, excluding `Bool`.
    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    pub const fn is_complex(&self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    /// Whether the dtype can appear in a persisted kernel record.
    ///
    /// `int16` and `uint64` exist in memory only (uint64 is the promoted
    /// scalar key type) and never name a persisted input.
    pub const fn is_persisted(&self) -> bool {
        !matches!(self, Self::Int16 | Self::UInt64)
    }

    /// Parse a persisted dtype name, stripping at most one namespace token.
    ///
    /// `"float32"` and `"torch.float32"` both parse to [`ScalarDType::Float32`];
    /// `"a.b.float32"` and names outside the persisted vocabulary are rejected.
    pub fn from_qualified_name(name: &str) -> Result<Self> {
        let bare = name.split_once('.').map_or(name, |(_, bare)| bare);
        Self::from_str(bare)
            .ok()
            .filter(Self::is_persisted)
            .ok_or_else(|| error::UnknownDTypeSnafu { name }.build())
    }
}
