//! Fallback kernels invoked when no compiled kernel is available.

use kiln_device::DispatchKeySet;

use crate::error::Result;
use crate::schema::OperatorHandle;
use crate::value::Stack;

/// Reference implementation of an operator.
///
/// The fallback owns the stack for the duration of the call: it pops the
/// arguments and pushes the results itself.
pub trait FallbackKernel: Send + Sync {
    fn call(&self, op: &OperatorHandle, keys: DispatchKeySet, stack: &mut Stack) -> Result<()>;
}

impl<F> FallbackKernel for F
where
    F: Fn(&OperatorHandle, DispatchKeySet, &mut Stack) -> Result<()> + Send + Sync,
{
    fn call(&self, op: &OperatorHandle, keys: DispatchKeySet, stack: &mut Stack) -> Result<()> {
        self(op, keys, stack)
    }
}
