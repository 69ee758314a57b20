use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use kiln_dtype::{Device, DeviceType};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use snafu::OptionExt;

use crate::error::{InvalidDeviceSnafu, MissingRunnerFactorySnafu, Result, UnsupportedBackendSnafu};
use crate::runner::{KernelRunner, RunnerBackend, RunnerFactory};

/// Extension trait for Device to add parsing functionality.
pub trait DeviceExt {
    /// Parse a device string into a Device.
    ///
    /// Examples:
    /// - "cpu" -> cpu (no index)
    /// - "CUDA:1" -> cuda:1
    /// - "cuda" -> cuda:0 (accelerators default to device 0)
    fn parse(s: &str) -> Result<Device>;
}

impl DeviceExt for Device {
    fn parse(s: &str) -> Result<Self> {
        let (kind, index) = match s.split_once(':') {
            Some((kind, index)) => (kind, Some(index)),
            None => (s, None),
        };
        let kind = DeviceType::parse(kind).ok().context(InvalidDeviceSnafu { device: s })?;
        let index = match index {
            Some(index) => Some(index.parse::<u8>().ok().context(InvalidDeviceSnafu { device: s })?),
            None if kind == DeviceType::Cpu => None,
            None => Some(0),
        };
        Ok(Device::new(kind, index))
    }
}

/// Registry of runner factories, one per [`RunnerBackend`].
///
/// The execution runtime registers its loaders here; the dispatch cache asks
/// the registry to turn an artifact path into a runner.
pub struct RunnerRegistry {
    factories: RwLock<HashMap<RunnerBackend, RunnerFactory>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self { factories: RwLock::new(HashMap::new()) }
    }

    /// Register (or replace) the factory for a backend.
    pub fn register_factory(&self, backend: RunnerBackend, factory: RunnerFactory) {
        self.factories.write().insert(backend, factory);
    }

    pub fn has_factory(&self, backend: RunnerBackend) -> bool {
        self.factories.read().contains_key(&backend)
    }

    /// Load the artifact at `artifact` with the backend selected for `device`.
    pub fn load(&self, device: DeviceType, artifact: &Path) -> Result<Arc<dyn KernelRunner>> {
        let backend = RunnerBackend::select(device).context(UnsupportedBackendSnafu { device })?;
        let factory = self.factories.read().get(&backend).cloned().context(MissingRunnerFactorySnafu { backend })?;

        tracing::debug!(%backend, artifact = %artifact.display(), "loading kernel artifact");
        factory(artifact)
    }
}

impl Default for RunnerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global runner registry instance.
static RUNNERS: Lazy<Arc<RunnerRegistry>> = Lazy::new(|| Arc::new(RunnerRegistry::new()));

/// Get the global runner registry.
pub fn runners() -> Arc<RunnerRegistry> {
    Arc::clone(&RUNNERS)
}
