use std::path::Path;
use std::sync::Arc;

use kiln_device::{DispatchKey, DispatchKeySet, KernelRunner, RunnerBackend, RunnerRegistry, Tensor};
use kiln_dtype::{Device, DeviceType, ScalarDType};
use parking_lot::Mutex;

use crate::error::Error;
use crate::kernel_cache::{KernelCache, PopulateContext};
use crate::meta_info::{KernelMetaInfo, TensorMetaInfo};
use crate::schema::ArgType;
use crate::store::PersistedKernel;
use crate::tensor_check::LocalState;
use crate::test::helpers::{FakeRunner, cpu_f32, descriptor, record, registry_with};

fn probe(tensors: &[Tensor]) -> KernelMetaInfo {
    KernelMetaInfo(tensors.iter().map(|t| TensorMetaInfo::from_tensor(t, &ArgType::Tensor).unwrap()).collect())
}

fn ctx(runners: &RunnerRegistry, strict: bool) -> PopulateContext<'_> {
    PopulateContext {
        dispatch_keys: DispatchKeySet::only(DispatchKey::Cpu),
        device_type: DeviceType::Cpu,
        runners,
        strict,
    }
}

fn populated(records: Vec<PersistedKernel>) -> (KernelCache, Arc<Mutex<Vec<std::path::PathBuf>>>) {
    let loaded = Arc::default();
    let runners = registry_with(Arc::new(FakeRunner::default()), Arc::clone(&loaded));
    let mut cache = KernelCache::new();
    cache.populate(records, &ctx(&runners, false)).unwrap();
    (cache, loaded)
}

fn cpu_state() -> LocalState {
    LocalState::for_call(DispatchKeySet::only(DispatchKey::Cpu))
}

#[test]
fn test_static_entry_found_by_exact_key() {
    let (cache, loaded) =
        populated(vec![record("/kernels/add_2x3.so", vec![descriptor(DeviceType::Cpu, -1, "float32", &[2, 3]); 2])]);
    assert_eq!(cache.len(), 1);
    assert_eq!(loaded.lock().len(), 1);

    let inputs = [cpu_f32(&[2, 3]), cpu_f32(&[2, 3])];
    assert!(cache.lookup(&probe(&inputs), &inputs, &cpu_state()).is_some());

    let other = [cpu_f32(&[2, 3]), cpu_f32(&[3, 2])];
    assert!(cache.lookup(&probe(&other), &other, &cpu_state()).is_none());
}

#[test]
fn test_dynamic_entry_found_by_scan() {
    let mut desc = descriptor(DeviceType::Cpu, -1, "float32", &[8, 4]);
    desc.sizes[0] = None;
    desc.strides[0] = None;
    let (cache, _) = populated(vec![record("/kernels/dyn.so", vec![desc])]);

    for rows in [1, 8, 33] {
        let inputs = [cpu_f32(&[rows, 4])];
        assert!(cache.lookup(&probe(&inputs), &inputs, &cpu_state()).is_some(), "rows = {rows}");
    }
    let inputs = [cpu_f32(&[8, 5])];
    assert!(cache.lookup(&probe(&inputs), &inputs, &cpu_state()).is_none());
}

struct NamedRunner(String);

impl KernelRunner for NamedRunner {
    fn run(&self, inputs: &[Tensor]) -> kiln_device::Result<Vec<Tensor>> {
        Ok(inputs.to_vec())
    }

    fn name(&self) -> &str {
        &self.0
    }
}

fn named_registry() -> RunnerRegistry {
    let registry = RunnerRegistry::new();
    registry.register_factory(
        RunnerBackend::Cpu,
        Arc::new(|path: &Path| Ok(Arc::new(NamedRunner(path.display().to_string())) as Arc<dyn KernelRunner>)),
    );
    registry
}

#[test]
fn test_exact_entry_preferred_over_dynamic() {
    let mut dynamic = descriptor(DeviceType::Cpu, -1, "float32", &[8]);
    dynamic.sizes[0] = None;
    let runners = named_registry();
    let mut cache = KernelCache::new();
    cache
        .populate(
            vec![
                record("/kernels/dyn.so", vec![dynamic]),
                record("/kernels/exact.so", vec![descriptor(DeviceType::Cpu, -1, "float32", &[8])]),
            ],
            &ctx(&runners, false),
        )
        .unwrap();
    assert_eq!(cache.len(), 2);

    let exact = [cpu_f32(&[8])];
    assert_eq!(cache.lookup(&probe(&exact), &exact, &cpu_state()).unwrap().runner.name(), "/kernels/exact.so");

    let other = [cpu_f32(&[16])];
    assert_eq!(cache.lookup(&probe(&other), &other, &cpu_state()).unwrap().runner.name(), "/kernels/dyn.so");
}

#[test]
fn test_failed_checks_are_a_miss() {
    let (cache, _) = populated(vec![record("/kernels/k.so", vec![descriptor(DeviceType::Cpu, -1, "float32", &[4])])]);
    let inputs = [cpu_f32(&[4])];
    let key = probe(&inputs);

    let transposed = [cpu_f32(&[4]).with_strides(&[2]).unwrap()];
    assert!(cache.lookup(&key, &transposed, &cpu_state()).is_none());

    assert!(cache.lookup(&key, &[], &cpu_state()).is_none());

    let excluded = LocalState::new().excluding(DispatchKeySet::only(DispatchKey::Cpu));
    assert!(cache.lookup(&key, &inputs, &excluded).is_none());
}

#[test]
fn test_malformed_record_skipped_by_default() {
    let (cache, loaded) = populated(vec![
        record("/kernels/bad.so", vec![descriptor(DeviceType::Cpu, -1, "float128", &[4])]),
        record("/kernels/good.so", vec![descriptor(DeviceType::Cpu, -1, "float32", &[4])]),
    ]);
    assert_eq!(cache.len(), 1);
    assert_eq!(loaded.lock().as_slice(), &[std::path::PathBuf::from("/kernels/good.so")]);
}

#[test]
fn test_malformed_record_fails_in_strict_mode() {
    let runners = registry_with(Arc::new(FakeRunner::default()), Arc::default());
    let mut cache = KernelCache::new();
    let err = cache
        .populate(
            vec![record("/kernels/bad.so", vec![descriptor(DeviceType::Cpu, -1, "float128", &[4])])],
            &ctx(&runners, true),
        )
        .unwrap_err();
    assert!(matches!(err, Error::MalformedRecord { .. }), "{err}");
    assert!(cache.is_empty());
}

#[test]
fn test_record_without_runner_is_skipped() {
    let runners = RunnerRegistry::new();
    let mut cache = KernelCache::new();
    let inserted = cache
        .populate(
            vec![record("/kernels/k.so", vec![descriptor(DeviceType::Cpu, -1, "float32", &[4])])],
            &ctx(&runners, true),
        )
        .unwrap();
    assert_eq!(inserted, 0);
    assert!(cache.is_empty());
}

#[test]
fn test_duplicate_keys_replace() {
    let desc = descriptor(DeviceType::Cpu, -1, "int64", &[3]);
    let (cache, _) = populated(vec![record("/kernels/a.so", vec![desc.clone()]), record("/kernels/b.so", vec![desc])]);
    assert_eq!(cache.len(), 1);

    let inputs = [Tensor::zeros(ScalarDType::Int64, &[3], Device::cpu())];
    assert!(cache.lookup(&probe(&inputs), &inputs, &cpu_state()).is_some());
}
