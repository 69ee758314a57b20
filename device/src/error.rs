use std::path::PathBuf;

use kiln_dtype::{DeviceType, ScalarDType};
use snafu::Snafu;

use crate::runner::RunnerBackend;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Byte length of tensor data does not match dtype and shape.
    #[snafu(display("size mismatch: expected {expected} bytes, got {actual}"))]
    SizeMismatch { expected: usize, actual: usize },

    /// Sizes and strides describe different ranks.
    #[snafu(display("rank mismatch: {sizes} sizes vs {strides} strides"))]
    RankMismatch { sizes: usize, strides: usize },

    /// `item()` called on a tensor that is not a single element.
    #[snafu(display("tensor with {numel} elements is not a scalar"))]
    NotAScalar { numel: usize },

    /// Invalid device specification.
    #[snafu(display("invalid device: {device}"))]
    InvalidDevice { device: String },

    /// No runner backend exists for this device type.
    #[snafu(display("no kernel runner backend for device type {device}"))]
    UnsupportedBackend { device: DeviceType },

    /// Backend is known but nothing registered a factory for it.
    #[snafu(display("no kernel runner factory registered for {backend}"))]
    MissingRunnerFactory { backend: RunnerBackend },

    /// The execution runtime could not load a compiled artifact.
    #[snafu(display("failed to load kernel artifact {}: {reason}", path.display()))]
    ArtifactLoad { path: PathBuf, reason: String },

    /// Kernel execution failed inside the runner.
    #[snafu(display("kernel runtime error: {message}"))]
    Runtime { message: String },

    /// Element type has no host decoding.
    #[snafu(display("cannot decode element of type {dtype}"))]
    UndecodableDType { dtype: ScalarDType },
}
