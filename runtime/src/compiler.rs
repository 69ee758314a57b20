//! Ahead-of-time compiler interface.

use std::path::PathBuf;

use kiln_dtype::DeviceType;

use crate::error::Result;
use crate::schema::{Argument, OperatorHandle};
use crate::value::IValue;

/// Everything the compiler needs to produce a kernel for one call.
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    pub namespace: &'a str,
    pub op_name: &'a str,
    /// `"default"` for the unnamed overload.
    pub overload: &'a str,
    pub device_type: DeviceType,
    pub strict: bool,
    pub op: &'a OperatorHandle,
    pub args: Vec<IValue>,
    pub kwargs: Vec<(String, IValue)>,
}

impl CompileRequest<'_> {
    /// Lowercase device name (`"cpu"`, `"cuda"`).
    pub fn device_name(&self) -> &'static str {
        self.device_type.name()
    }
}

/// Compiles an operator call into a loadable artifact.
///
/// `Ok(None)` (or an empty path) means no artifact could be produced; the
/// caller falls back. Implementations are expected to keep their own
/// persistent cache so repeated requests are cheap.
pub trait AotCompiler: Send + Sync {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Option<PathBuf>>;
}

/// Split call values into positional arguments and keyword-only `(name, value)` pairs.
pub fn split_args_kwargs(arguments: &[Argument], values: &[IValue]) -> (Vec<IValue>, Vec<(String, IValue)>) {
    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    for (argument, value) in arguments.iter().zip(values) {
        if argument.kwarg_only {
            kwargs.push((argument.name.clone(), value.clone()));
        } else {
            args.push(value.clone());
        }
    }
    (args, kwargs)
}
