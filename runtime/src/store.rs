//! Persisted kernel records and the store interface that serves them.

use std::path::PathBuf;

use kiln_dtype::{DeviceType, Scalar};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which records a holder asks the store for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelQuery {
    pub namespace: String,
    pub op_name: String,
    pub overload: String,
    pub device_type: DeviceType,
}

/// One previously compiled kernel and the inputs it was specialized for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedKernel {
    pub kernel_path: PathBuf,
    pub meta_info: Vec<TensorDescriptor>,
}

/// Persisted metadata of one kernel input.
///
/// `null` sizes or strides mark dynamic dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    #[serde(default)]
    pub is_dynamic: bool,
    pub device_type: String,
    #[serde(default = "no_device_index")]
    pub device_index: i64,
    /// Element type name, optionally namespaced (`torch.float32`).
    pub dtype: String,
    pub sizes: Vec<Option<i64>>,
    pub strides: Vec<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar_value: Option<DescriptorScalar>,
}

fn no_device_index() -> i64 {
    -1
}

/// Scalar literal as it appears in a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DescriptorScalar {
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
}

impl From<DescriptorScalar> for Scalar {
    fn from(value: DescriptorScalar) -> Self {
        match value {
            DescriptorScalar::Bool(v) => Scalar::Bool(v),
            DescriptorScalar::Int(v) => Scalar::Int(v),
            DescriptorScalar::UInt(v) => Scalar::UInt(v),
            DescriptorScalar::Float(v) => Scalar::Float(v),
        }
    }
}

/// Source of persisted kernel records, consulted once per holder at construction.
pub trait KernelStore: Send + Sync {
    fn load(&self, query: &KernelQuery) -> Result<Vec<PersistedKernel>>;
}
