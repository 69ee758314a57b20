//! Per-holder kernel cache.
//!
//! Entries are built once, from persisted records, while the owning holder is
//! constructed; afterwards the cache is read-only and needs no locking.
//!
//! Fully static keys live in an exact hash index. Keys with dynamic
//! dimensions can never equal a call-time key, so they are kept in an ordered
//! list scanned with [`KernelMetaInfo::admits`] when the exact lookup misses.

use std::collections::HashMap;
use std::sync::Arc;

use kiln_device::{DispatchKeySet, KernelRunner, RunnerRegistry, Tensor};
use kiln_dtype::DeviceType;
use snafu::ResultExt;
use tracing::{debug, trace, warn};

use crate::error::{DeviceSnafu, MalformedRecordSnafu, Result};
use crate::meta_info::{KernelMetaInfo, TensorMetaInfo};
use crate::store::PersistedKernel;
use crate::tensor_check::{LocalState, TensorCheck};

/// A loaded kernel and the checks its inputs must pass.
#[derive(Clone)]
pub struct KernelState {
    pub runner: Arc<dyn KernelRunner>,
    pub checks: Arc<[TensorCheck]>,
}

impl KernelState {
    /// Whether `inputs` satisfy every check, position by position.
    pub fn accepts(&self, state: &LocalState, inputs: &[Tensor]) -> bool {
        if self.checks.len() != inputs.len() {
            trace!(expected = self.checks.len(), actual = inputs.len(), "check count mismatch");
            return false;
        }
        self.checks.iter().zip(inputs).enumerate().all(|(position, (check, tensor))| {
            let mismatch = check.mismatch(state, tensor);
            if let Some(mismatch) = mismatch {
                trace!(position, %mismatch, "tensor check failed");
            }
            mismatch.is_none()
        })
    }
}

impl std::fmt::Debug for KernelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelState").field("runner", &self.runner.name()).field("checks", &self.checks.len()).finish()
    }
}

/// What population needs to turn records into entries.
pub struct PopulateContext<'a> {
    pub dispatch_keys: DispatchKeySet,
    pub device_type: DeviceType,
    pub runners: &'a RunnerRegistry,
    /// Fail on the first malformed record instead of skipping it.
    pub strict: bool,
}

#[derive(Debug, Default)]
pub struct KernelCache {
    exact: HashMap<KernelMetaInfo, KernelState>,
    dynamic: Vec<(KernelMetaInfo, KernelState)>,
}

impl KernelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.dynamic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace the entry for `key`.
    pub fn insert(&mut self, key: KernelMetaInfo, state: KernelState) {
        if key.is_static() {
            self.exact.insert(key, state);
        } else if let Some(slot) = self.dynamic.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = state;
        } else {
            self.dynamic.push((key, state));
        }
    }

    /// Find the first entry whose key matches `probe` and whose checks accept `inputs`.
    pub fn lookup(&self, probe: &KernelMetaInfo, inputs: &[Tensor], state: &LocalState) -> Option<&KernelState> {
        let exact = self.exact.get(probe).into_iter();
        let dynamic = self.dynamic.iter().filter(|(key, _)| key.admits(probe)).map(|(_, entry)| entry);
        exact.chain(dynamic).find(|entry| entry.accepts(state, inputs))
    }

    /// Build entries from persisted records; returns how many were inserted.
    pub fn populate(&mut self, records: Vec<PersistedKernel>, ctx: &PopulateContext<'_>) -> Result<usize> {
        let mut inserted = 0;
        for record in records {
            let key = match rebuild_key(&record).context(MalformedRecordSnafu { kernel_path: &record.kernel_path }) {
                Ok(key) => key,
                Err(e) if ctx.strict => return Err(e),
                Err(e) => {
                    warn!(error = %e, "skipping persisted kernel record");
                    continue;
                }
            };

            let runner = match ctx.runners.load(ctx.device_type, &record.kernel_path).context(DeviceSnafu) {
                Ok(runner) => runner,
                Err(e) => {
                    warn!(error = %e, kernel_path = %record.kernel_path.display(), "no runner for persisted kernel");
                    continue;
                }
            };

            let checks: Arc<[TensorCheck]> =
                key.0.iter().map(|meta| TensorCheck::new(ctx.dispatch_keys, meta)).collect();
            self.insert(key, KernelState { runner, checks });
            inserted += 1;
        }

        debug!(inserted, exact = self.exact.len(), dynamic = self.dynamic.len(), "kernel cache populated");
        Ok(inserted)
    }
}

fn rebuild_key(record: &PersistedKernel) -> Result<KernelMetaInfo> {
    record.meta_info.iter().map(TensorMetaInfo::from_descriptor).collect::<Result<Vec<_>>>().map(KernelMetaInfo)
}
