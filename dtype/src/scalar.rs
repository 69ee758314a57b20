//! Bare scalar values as they appear on an operator call stack.

use crate::ScalarDType;

/// A scalar literal carried by value (not a tensor).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex { re: f64, im: f64 },
}

impl Scalar {
    /// Native element type of the literal.
    ///
    /// Literals are always carried at full width, so a materialized scalar
    /// tensor is `int64`, `uint64`, `float64`, `complex128` or `bool`.
    pub const fn dtype(&self) -> ScalarDType {
        match self {
            Self::Bool(_) => ScalarDType::Bool,
            Self::Int(_) => ScalarDType::Int64,
            Self::UInt(_) => ScalarDType::UInt64,
            Self::Float(_) => ScalarDType::Float64,
            Self::Complex { .. } => ScalarDType::Complex128,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match *self {
            Self::Bool(v) => Some(v as u8 as f64),
            Self::Int(v) => Some(v as f64),
            Self::UInt(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            Self::Complex { .. } => None,
        }
    }

    /// Integral value reinterpreted as `u64`; negative values wrap.
    pub fn to_u64_wrapping(&self) -> Option<u64> {
        match *self {
            Self::Bool(v) => Some(v as u64),
            Self::Int(v) => Some(v as u64),
            Self::UInt(v) => Some(v),
            Self::Float(_) | Self::Complex { .. } => None,
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            Self::Int(v) => Some(v != 0),
            Self::UInt(v) => Some(v != 0),
            Self::Float(v) => Some(v != 0.0),
            Self::Complex { re, im } => Some(re != 0.0 || im != 0.0),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
