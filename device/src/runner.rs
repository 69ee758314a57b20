//! Compiled-kernel runners.
//!
//! A runner wraps one loaded ahead-of-time artifact and executes it on
//! tensors. Loading and execution belong to the execution runtime; this module
//! only fixes the interface and the pure mapping from device type to runner
//! backend.

use std::path::Path;
use std::sync::Arc;

use kiln_dtype::DeviceType;

use crate::error::Result;
use crate::tensor::Tensor;

/// A loaded, executable compiled kernel.
///
/// Runners may be shared between the kernel cache and in-flight calls, so
/// they must be callable concurrently. Any process-wide lock the runtime
/// needs (e.g. for accelerator allocation) is acquired inside `run`.
pub trait KernelRunner: Send + Sync {
    /// Execute the kernel. Outputs come back in declared return order.
    fn run(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>>;

    /// Get the kernel name (for debugging/profiling).
    fn name(&self) -> &str;
}

/// Runner implementation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum RunnerBackend {
    Cpu,
    Cuda,
}

impl RunnerBackend {
    /// Runner backend for a device type; `None` when compiled kernels cannot run there.
    pub const fn select(device: DeviceType) -> Option<Self> {
        match device {
            DeviceType::Cpu => Some(Self::Cpu),
            DeviceType::Cuda => Some(Self::Cuda),
            DeviceType::Metal | DeviceType::WebGpu | DeviceType::Meta => None,
        }
    }
}

/// Factory that loads the artifact at a path into a runner.
pub type RunnerFactory = Arc<dyn Fn(&Path) -> Result<Arc<dyn KernelRunner>> + Send + Sync>;
