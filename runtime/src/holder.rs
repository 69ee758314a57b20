//! Dispatch controller: one holder per (operator, overload, dispatch key).
//!
//! Every call walks `Lookup -> {Hit, MissCompile, MissFallback}`:
//!
//! * **Hit** - a cached kernel accepts the inputs; it runs and its outputs
//!   replace the arguments on the stack.
//! * **MissCompile** - the compiler produces an artifact, which is loaded and
//!   run the same way. Results are not written back to the cache.
//! * **MissFallback** - no artifact; the fallback kernel handles the call.
//!
//! Operators that do not return exactly one tensor skip lookup and go
//! straight to the miss path.

use std::path::PathBuf;
use std::sync::Arc;

use bon::bon;
use kiln_device::{DispatchKey, DispatchKeySet, KernelRunner, RunnerBackend, RunnerRegistry, Tensor};
use kiln_dtype::{Device, DeviceType};
use papaya::Operation;
use parking_lot::Mutex;
use snafu::{OptionExt, ResultExt};
use tracing::{debug, warn};

use crate::compiler::{AotCompiler, CompileRequest, split_args_kwargs};
use crate::config::HolderConfig;
use crate::error::{
    DeviceSnafu, MissingFallbackSnafu, Result, StackUnderflowSnafu, UnpackSnafu, UnsupportedDeviceSnafu,
};
use crate::fallback::FallbackKernel;
use crate::kernel_cache::{KernelCache, KernelState, PopulateContext};
use crate::meta_info::KernelMetaInfo;
use crate::normalize::{NormalizedArgs, Scalars, normalize};
use crate::schema::{OperatorHandle, OperatorName};
use crate::stats::{CacheEvent, CacheStats, StatsSnapshot};
use crate::store::{KernelQuery, KernelStore};
use crate::tensor_check::LocalState;
use crate::value::{IValue, Stack, StackExt};

/// Which path served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DispatchPath {
    Hit,
    Compiled,
    Fallback,
}

enum Lookup {
    Hit(KernelState),
    /// Carries the probe key when the inputs could be keyed at all.
    Miss(Option<KernelMetaInfo>),
}

pub struct KernelHolder {
    namespace: String,
    op_name: String,
    overload: String,
    dispatch_key: DispatchKey,
    /// Device scalars are materialized on; `None` when the key has no device.
    device: Option<Device>,
    compiler: Arc<dyn AotCompiler>,
    fallback: Option<Arc<dyn FallbackKernel>>,
    runners: Arc<RunnerRegistry>,
    config: HolderConfig,
    cache: KernelCache,
    compile_gates: papaya::HashMap<KernelMetaInfo, Arc<Mutex<()>>>,
    stats: CacheStats,
}

#[bon]
impl KernelHolder {
    /// Create a holder and populate its cache from `store`.
    ///
    /// `op_name` may carry a `namespace::` prefix, which is stripped.
    /// `runners` defaults to the global registry.
    #[builder]
    pub fn new(
        #[builder(into)] namespace: String,
        #[builder(into)] op_name: String,
        #[builder(into, default)] overload: String,
        dispatch_key: DispatchKey,
        compiler: Arc<dyn AotCompiler>,
        store: Option<Arc<dyn KernelStore>>,
        fallback: Option<Arc<dyn FallbackKernel>>,
        runners: Option<Arc<RunnerRegistry>>,
        #[builder(default)] config: HolderConfig,
    ) -> Result<Self> {
        let op_name = OperatorName::parse(&op_name).name;
        let device_type = dispatch_key.device_type();

        let mut holder = Self {
            namespace,
            op_name,
            overload,
            dispatch_key,
            device: device_type.map(|kind| Device::new(kind, Some(0))),
            compiler,
            fallback,
            runners: runners.unwrap_or_else(kiln_device::runners),
            config,
            cache: KernelCache::new(),
            compile_gates: papaya::HashMap::new(),
            stats: CacheStats::default(),
        };

        match (device_type, store) {
            (Some(device_type), Some(store)) => holder.populate(store.as_ref(), device_type)?,
            _ => debug!(key = %dispatch_key, "kernel cache population skipped"),
        }
        Ok(holder)
    }
}

impl KernelHolder {
    fn populate(&mut self, store: &dyn KernelStore, device_type: DeviceType) -> Result<()> {
        let query = KernelQuery {
            namespace: self.namespace.clone(),
            op_name: self.op_name.clone(),
            overload: self.overload.clone(),
            device_type,
        };
        let records = match store.load(&query) {
            Ok(records) => records,
            Err(e) if self.config.strict_cache_load => return Err(e),
            Err(e) => {
                warn!(error = %e, op = %self.qualified_name(), "kernel store unavailable, starting with an empty cache");
                return Ok(());
            }
        };

        let ctx = PopulateContext {
            dispatch_keys: DispatchKeySet::only(DispatchKey::backend(device_type)),
            device_type,
            runners: &self.runners,
            strict: self.config.strict_cache_load,
        };
        self.cache.populate(records, &ctx)?;
        Ok(())
    }

    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.namespace, self.op_name)
    }

    /// Overload name as handed to collaborators.
    pub fn overload(&self) -> &str {
        if self.overload.is_empty() { "default" } else { &self.overload }
    }

    pub fn dispatch_key(&self) -> DispatchKey {
        self.dispatch_key
    }

    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Serve one operator call.
    ///
    /// The top `N` stack values (`N` = formal argument count) are the
    /// arguments. On a hit or a compiled miss they are replaced by the
    /// kernel's outputs; on a fallback the fallback kernel owns the stack.
    #[tracing::instrument(skip_all, fields(op = %self.qualified_name(), overload = %self.overload()))]
    pub fn call(&self, op: &OperatorHandle, keys: DispatchKeySet, stack: &mut Stack) -> Result<DispatchPath> {
        match self.cache_lookup(op, keys, stack)? {
            Lookup::Hit(entry) => {
                let outputs = self.run_kernel(entry.runner.as_ref(), op, self.device_or_err()?, stack)?;
                stack.replace_top(op.schema().arguments.len(), outputs.into_iter().map(IValue::Tensor));
                Ok(DispatchPath::Hit)
            }
            Lookup::Miss(probe) => self.cache_miss(op, keys, stack, probe.as_ref()),
        }
    }

    fn cache_lookup(&self, op: &OperatorHandle, keys: DispatchKeySet, stack: &Stack) -> Result<Lookup> {
        if !op.schema().returns_single_tensor() {
            self.stats.record(CacheEvent::Ineligible);
            debug!(returns = op.schema().returns.len(), "operator not eligible for cached kernels");
            return Ok(Lookup::Miss(None));
        }

        self.stats.record(CacheEvent::Lookup);
        let Some((probe, inputs)) = self.probe(op, stack)? else {
            self.stats.record(CacheEvent::Miss);
            return Ok(Lookup::Miss(None));
        };

        match self.cache.lookup(&probe, &inputs.tensors, &LocalState::for_call(keys)) {
            Some(entry) => {
                self.stats.record(CacheEvent::Hit);
                debug!(kernel = entry.runner.name(), "kernel cache hit");
                Ok(Lookup::Hit(entry.clone()))
            }
            None => {
                self.stats.record(CacheEvent::Miss);
                debug!(inputs = inputs.len(), "kernel cache miss");
                Ok(Lookup::Miss(Some(probe)))
            }
        }
    }

    /// Key the call's inputs; `None` when they cannot be served from the cache.
    fn probe(&self, op: &OperatorHandle, stack: &Stack) -> Result<Option<(KernelMetaInfo, NormalizedArgs)>> {
        let arguments = &op.schema().arguments;
        let (Some(device), Some(values)) = (self.device, stack.last_n(arguments.len())) else {
            return Ok(None);
        };
        let inputs = match normalize(arguments, values, device, Scalars::Include) {
            Ok(inputs) if !inputs.is_empty() => inputs,
            Ok(_) => return Ok(None),
            Err(unsupported) => {
                debug!(slot = unsupported.slot, kind = unsupported.kind, "inputs not cacheable");
                return Ok(None);
            }
        };
        let probe = KernelMetaInfo::from_inputs(&inputs, arguments)?;
        Ok(Some((probe, inputs)))
    }

    fn cache_miss(
        &self,
        op: &OperatorHandle,
        keys: DispatchKeySet,
        stack: &mut Stack,
        probe: Option<&KernelMetaInfo>,
    ) -> Result<DispatchPath> {
        let device_type = self
            .dispatch_key
            .device_type()
            .filter(|kind| RunnerBackend::select(*kind).is_some())
            .with_context(|| UnsupportedDeviceSnafu {
                op: self.qualified_name(),
                overload: self.overload(),
                device: self.device_name(),
            })?;

        let artifact = match probe.filter(|_| self.config.single_flight) {
            Some(key) => {
                let gate = self.compile_gate(key);
                let produced = {
                    let _serialized = gate.lock();
                    self.produce_kernel(op, stack, device_type)
                };
                self.release_gate(key, &gate);
                produced?
            }
            None => self.produce_kernel(op, stack, device_type)?,
        };

        let Some(artifact) = artifact else {
            let fallback = self.fallback.as_ref().with_context(|| MissingFallbackSnafu {
                op: self.qualified_name(),
                overload: self.overload(),
                device: self.device_name(),
            })?;
            self.stats.record(CacheEvent::Fallback);
            debug!("running fallback kernel");
            fallback.call(op, keys, stack)?;
            return Ok(DispatchPath::Fallback);
        };

        let runner = self.runners.load(device_type, &artifact).context(DeviceSnafu)?;
        let outputs = self.run_kernel(runner.as_ref(), op, Device::new(device_type, Some(0)), stack)?;
        if !outputs.is_empty() {
            stack.replace_top(op.schema().arguments.len(), outputs.into_iter().map(IValue::Tensor));
        }
        self.stats.record(CacheEvent::Compile);
        debug!(artifact = %artifact.display(), "ran freshly compiled kernel");
        Ok(DispatchPath::Compiled)
    }

    /// Ask the compiler for an artifact. Compiler failures degrade to "no artifact".
    fn produce_kernel(&self, op: &OperatorHandle, stack: &Stack, device_type: DeviceType) -> Result<Option<PathBuf>> {
        let arguments = &op.schema().arguments;
        let values = self.arguments_of(op, stack)?;
        let (args, kwargs) = split_args_kwargs(arguments, values);
        let request = CompileRequest {
            namespace: &self.namespace,
            op_name: &self.op_name,
            overload: self.overload(),
            device_type,
            strict: self.config.strict_compile,
            op,
            args,
            kwargs,
        };

        match self.compiler.compile(&request) {
            Ok(Some(path)) if !path.as_os_str().is_empty() => Ok(Some(path)),
            Ok(_) => {
                warn!("compiler produced no kernel artifact");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "kernel compilation failed");
                Ok(None)
            }
        }
    }

    /// Run `runner` on the call's tensor inputs; scalars are baked into compiled kernels.
    fn run_kernel(
        &self,
        runner: &dyn KernelRunner,
        op: &OperatorHandle,
        device: Device,
        stack: &Stack,
    ) -> Result<Vec<Tensor>> {
        let values = self.arguments_of(op, stack)?;
        let inputs = normalize(&op.schema().arguments, values, device, Scalars::Skip)
            .map_err(|u| UnpackSnafu { op: op.to_string(), slot: u.slot, kind: u.kind }.build())?;
        runner.run(&inputs.tensors).context(DeviceSnafu)
    }

    fn arguments_of<'s>(&self, op: &OperatorHandle, stack: &'s Stack) -> Result<&'s [IValue]> {
        let expected = op.schema().arguments.len();
        stack.last_n(expected).context(StackUnderflowSnafu { op: op.to_string(), expected, actual: stack.len() })
    }

    fn compile_gate(&self, key: &KernelMetaInfo) -> Arc<Mutex<()>> {
        let gates = self.compile_gates.pin();
        Arc::clone(gates.get_or_insert_with(key.clone(), || Arc::new(Mutex::new(()))))
    }

    /// Drop the gate for `key` once no other caller holds or waits on it.
    ///
    /// Nothing is written back after a compile, so an idle gate is never needed again.
    fn release_gate(&self, key: &KernelMetaInfo, gate: &Arc<Mutex<()>>) {
        let gates = self.compile_gates.pin();
        // One reference is the map's, the other is ours.
        let _ = gates.compute(key.clone(), |entry| match entry {
            Some((_, held)) if Arc::ptr_eq(held, gate) && Arc::strong_count(held) == 2 => Operation::Remove,
            _ => Operation::Abort(()),
        });
    }

    /// Gates currently held by in-flight compiles.
    pub(crate) fn compile_gate_count(&self) -> usize {
        self.compile_gates.len()
    }

    fn device_or_err(&self) -> Result<Device> {
        self.device.with_context(|| UnsupportedDeviceSnafu {
            op: self.qualified_name(),
            overload: self.overload(),
            device: self.device_name(),
        })
    }

    fn device_name(&self) -> &'static str {
        self.dispatch_key.device_type().map_or("none", |kind| kind.name())
    }
}
