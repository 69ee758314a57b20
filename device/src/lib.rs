//! Device-side plumbing for the kiln dispatch cache.
//!
//! Provides the minimal tensor value the cache inspects, the dispatch keys a
//! call is routed under, and the [`KernelRunner`] interface through which
//! compiled artifacts are executed. Runners themselves come from the
//! execution runtime and are registered per [`RunnerBackend`] in a
//! [`RunnerRegistry`].

pub mod dispatch_key;
pub mod error;
pub mod registry;
pub mod runner;
pub mod tensor;


pub use dispatch_key::{DispatchKey, DispatchKeySet};
pub use error::{Error, Result};
pub use kiln_dtype::{Device, DeviceIndex, DeviceType, Scalar, ScalarDType};
pub use registry::{DeviceExt, RunnerRegistry, runners};
pub use runner::{KernelRunner, RunnerBackend, RunnerFactory};
pub use tensor::Tensor;
