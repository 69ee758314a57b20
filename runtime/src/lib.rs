//! Runtime kernel-selection cache for ahead-of-time compiled operators.
//!
//! A [`KernelHolder`] sits between an operator dispatcher and a reference
//! (fallback) implementation. On each call it keys the inputs by their
//! metadata, looks for a previously compiled kernel that accepts them, and
//! otherwise asks an [`AotCompiler`] for one, falling back to the reference
//! kernel when nothing can be compiled.
//!
//! # Collaborators
//!
//! The holder owns none of its heavy collaborators. They are injected as
//! traits:
//!
//! * [`KernelStore`] - persisted records of previously compiled kernels.
//! * [`AotCompiler`] - produces artifacts on a miss.
//! * [`FallbackKernel`] - reference implementation.
//! * [`RunnerRegistry`](kiln_device::RunnerRegistry) - turns artifacts into runners.

pub mod compiler;
pub mod config;
pub mod error;
pub mod fallback;
pub mod holder;
pub mod kernel_cache;
pub mod meta_info;
pub mod normalize;
pub mod schema;
pub mod stats;
pub mod store;
pub mod tensor_check;
pub mod value;


pub use compiler::{AotCompiler, CompileRequest};
pub use config::HolderConfig;
pub use error::{Error, Result};
pub use fallback::FallbackKernel;
pub use holder::{DispatchPath, KernelHolder};
pub use kernel_cache::{KernelCache, KernelState};
pub use meta_info::{KernelMetaInfo, ScalarLiteral, SymDim, TensorMetaInfo};
pub use schema::{ArgType, Argument, FunctionSchema, NumberType, OperatorHandle, OperatorName};
pub use stats::StatsSnapshot;
pub use store::{DescriptorScalar, KernelQuery, KernelStore, PersistedKernel, TensorDescriptor};
pub use tensor_check::{LocalState, TensorCheck};
pub use value::{IValue, Stack, StackExt};
