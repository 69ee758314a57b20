use kiln_device::{DispatchKey, DispatchKeySet, Tensor};
use kiln_dtype::{Device, DeviceType, Scalar, ScalarDType};
use test_case::test_case;

use crate::meta_info::TensorMetaInfo;
use crate::store::DescriptorScalar;
use crate::tensor_check::{LocalState, Mismatch, TensorCheck};
use crate::test::helpers::{cpu_f32, descriptor, scalar_descriptor};

fn cpu_keys() -> DispatchKeySet {
    DispatchKeySet::only(DispatchKey::Cpu)
}

fn check_for(sizes: &[i64]) -> TensorCheck {
    let meta = TensorMetaInfo::from_descriptor(&descriptor(DeviceType::Cpu, -1, "float32", sizes)).unwrap();
    TensorCheck::new(cpu_keys(), &meta)
}

#[test]
fn test_matching_tensor_passes() {
    let check = check_for(&[2, 3]);
    assert!(check.check(&LocalState::for_call(cpu_keys()), &cpu_f32(&[2, 3])));
}

#[test_case(Tensor::zeros(ScalarDType::Float64, &[2, 3], Device::cpu()), Mismatch::DType; "dtype")]
#[test_case(cpu_f32(&[2, 4]), Mismatch::Size; "size")]
#[test_case(cpu_f32(&[6]), Mismatch::Rank; "rank")]
#[test_case(cpu_f32(&[2, 3]).with_strides(&[1, 2]).unwrap(), Mismatch::Stride; "stride")]
#[test_case(Tensor::zeros(ScalarDType::Float32, &[2, 3], Device::cuda(0)), Mismatch::DeviceIndex; "device_index")]
fn test_first_mismatch(tensor: Tensor, expected: Mismatch) {
    let check = check_for(&[2, 3]);
    assert_eq!(check.mismatch(&LocalState::for_call(cpu_keys()), &tensor), Some(expected));
}

#[test]
fn test_dynamic_dims_accept_any_extent() {
    let mut desc = descriptor(DeviceType::Cpu, -1, "float32", &[4, 3]);
    desc.sizes[0] = None;
    desc.strides[0] = None;
    let check = TensorCheck::new(cpu_keys(), &TensorMetaInfo::from_descriptor(&desc).unwrap());
    let state = LocalState::for_call(cpu_keys());

    assert!(check.check(&state, &cpu_f32(&[1, 3])));
    assert!(check.check(&state, &cpu_f32(&[97, 3])));
    assert!(!check.check(&state, &cpu_f32(&[97, 2])));
}

#[test]
fn test_cuda_device_index_compared() {
    let meta = TensorMetaInfo::from_descriptor(&descriptor(DeviceType::Cuda, 1, "float32", &[2])).unwrap();
    let keys = DispatchKeySet::only(DispatchKey::Cuda);
    let check = TensorCheck::new(keys, &meta);
    let state = LocalState::for_call(keys);

    assert!(check.check(&state, &Tensor::zeros(ScalarDType::Float32, &[2], Device::cuda(1))));
    assert_eq!(
        check.mismatch(&state, &Tensor::zeros(ScalarDType::Float32, &[2], Device::cuda(0))),
        Some(Mismatch::DeviceIndex)
    );
}

#[test]
fn test_cpu_tensor_with_any_ordinal_passes() {
    let check = check_for(&[2]);
    let tensor = Tensor::zeros(ScalarDType::Float32, &[2], Device::new(DeviceType::Cpu, Some(5)));
    assert!(check.check(&LocalState::for_call(cpu_keys()), &tensor));
}

#[test]
fn test_functionality_keys_do_not_affect_backend_match() {
    let check = check_for(&[2]);
    let tensor = cpu_f32(&[2]).with_extra_keys(DispatchKey::Python | DispatchKey::AutocastCpu);
    assert!(check.check(&LocalState::for_call(cpu_keys()), &tensor));
}

#[test]
fn test_excluded_backend_fails_key_check() {
    let check = check_for(&[2]);
    let state = LocalState::new().excluding(DispatchKeySet::only(DispatchKey::Cpu));
    assert_eq!(check.mismatch(&state, &cpu_f32(&[2])), Some(Mismatch::DispatchKeys));
}

#[test]
fn test_included_backend_fails_key_check() {
    let check = check_for(&[2]);
    let state = LocalState::new().including(DispatchKeySet::only(DispatchKey::Meta));
    assert_eq!(check.mismatch(&state, &cpu_f32(&[2])), Some(Mismatch::DispatchKeys));
}

#[test]
fn test_scalar_position_compares_promoted_dtype() {
    let meta = TensorMetaInfo::from_descriptor(&scalar_descriptor("int32", DescriptorScalar::Int(7))).unwrap();
    let check = TensorCheck::new(cpu_keys(), &meta);
    let state = LocalState::for_call(cpu_keys());

    assert!(check.check(&state, &Tensor::scalar(Scalar::Int(7), Device::cpu())));
    assert!(check.check(&state, &Tensor::from_vec(vec![7i32], &[], Device::cpu()).unwrap()));
    assert_eq!(
        check.mismatch(&state, &Tensor::scalar(Scalar::Float(7.0), Device::cpu())),
        Some(Mismatch::DType)
    );
}
