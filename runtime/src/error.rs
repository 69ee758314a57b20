//! Error types for the dispatch cache.

use std::path::PathBuf;

use kiln_dtype::ScalarDType;
use snafu::Snafu;

/// Result type for dispatch cache operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Configuration and collaborator errors surfaced by the dispatch cache.
///
/// Cache misses are never errors; only conditions that make a call or a
/// holder unusable end up here.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The holder's dispatch key maps to a device no compiled kernel can run on.
    #[snafu(display("unsupported device '{device}' for {op}.{overload}"))]
    UnsupportedDevice { op: String, overload: String, device: String },

    /// No artifact was produced and no fallback kernel is configured.
    #[snafu(display("no compiled kernel and no fallback for {op}.{overload} on '{device}'"))]
    MissingFallback { op: String, overload: String, device: String },

    /// A scalar argument of a kind the cache cannot key on.
    #[snafu(display("unsupported scalar kind {dtype}"))]
    UnsupportedScalarKind { dtype: ScalarDType },

    /// A scalar literal that does not fit its declared dtype.
    #[snafu(display("scalar literal {literal} is not representable as {dtype}"))]
    ScalarLiteral { dtype: ScalarDType, literal: String },

    /// Persisted sizes and strides describe different ranks.
    #[snafu(display("descriptor rank mismatch: {sizes} sizes vs {strides} strides"))]
    DescriptorRank { sizes: usize, strides: usize },

    /// Persisted device ordinal is out of range.
    #[snafu(display("device index {index} out of range"))]
    DeviceIndex { index: i64 },

    /// A persisted record could not be rebuilt into a cache entry.
    #[snafu(display("malformed kernel record {}: {source}", kernel_path.display()))]
    MalformedRecord {
        kernel_path: PathBuf,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    /// The execution path could not normalize arguments the schema accepted.
    #[snafu(display("cannot unpack argument {slot} ({kind}) of {op}"))]
    Unpack { op: String, slot: usize, kind: &'static str },

    /// The stack holds fewer values than the schema declares.
    #[snafu(display("stack underflow for {op}: expected {expected} arguments, found {actual}"))]
    StackUnderflow { op: String, expected: usize, actual: usize },

    /// The persisted kernel store failed.
    #[snafu(display("kernel store error: {message}"))]
    Store { message: String },

    /// The ahead-of-time compiler failed.
    #[snafu(display("compiler error: {message}"))]
    Compiler { message: String },

    /// The fallback kernel failed.
    #[snafu(display("fallback kernel error: {message}"))]
    Fallback { message: String },

    /// Scalar type or device name error.
    #[snafu(display("{source}"))]
    DType { source: kiln_dtype::Error },

    /// Tensor, dispatch key or runner error.
    #[snafu(display("device error: {source}"))]
    Device { source: kiln_device::Error },
}
