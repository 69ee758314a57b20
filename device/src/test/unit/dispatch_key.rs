use enumset::EnumSet;
use strum::IntoEnumIterator;

use crate::DeviceType;
use crate::dispatch_key::{BACKEND_KEYS, DispatchKey, backend_keys, device_key_set};

#[test]
fn test_backend_keys_match_predicate() {
    for key in DispatchKey::iter() {
        assert_eq!(BACKEND_KEYS.contains(key), key.is_backend(), "{key}");
    }
}

#[test]
fn test_backend_roundtrip() {
    for device in DeviceType::iter() {
        assert_eq!(DispatchKey::backend(device).device_type(), Some(device));
    }
}

#[test]
fn test_functionality_keys_map_to_device() {
    assert_eq!(DispatchKey::AutogradCuda.device_type(), Some(DeviceType::Cuda));
    assert_eq!(DispatchKey::AutocastCpu.device_type(), Some(DeviceType::Cpu));
    assert_eq!(DispatchKey::Python.device_type(), None);
}

#[test]
fn test_backend_keys_filters_functionality() {
    let keys = device_key_set(DeviceType::Cuda) | DispatchKey::Python;
    assert_eq!(backend_keys(keys), EnumSet::only(DispatchKey::Cuda));
}
