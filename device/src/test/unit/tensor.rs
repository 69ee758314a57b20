use std::sync::Arc;

use test_case::test_case;

use crate::tensor::contiguous_strides;
use crate::{Device, DispatchKey, Error, Scalar, ScalarDType, Tensor};

#[test_case(&[], &[]; "zero_dim")]
#[test_case(&[5], &[1]; "vector")]
#[test_case(&[4, 4], &[4, 1]; "matrix")]
#[test_case(&[2, 3, 4], &[12, 4, 1]; "rank3")]
#[test_case(&[2, 0, 3], &[3, 3, 1]; "empty_dim")]
fn test_contiguous_strides(sizes: &[i64], expected: &[i64]) {
    assert_eq!(contiguous_strides(sizes).as_slice(), expected);
}

#[test]
fn test_from_vec_metadata() {
    let t = Tensor::from_vec(vec![1.0f32; 16], &[4, 4], Device::cpu()).unwrap();
    assert_eq!(t.dtype(), ScalarDType::Float32);
    assert_eq!(t.sizes(), &[4, 4]);
    assert_eq!(t.strides(), &[4, 1]);
    assert_eq!(t.numel(), 16);
    assert_eq!(t.data().len(), 64);
}

#[test]
fn test_from_bytes_size_mismatch() {
    let err = Tensor::from_bytes(ScalarDType::Int32, &[3], Device::cpu(), Arc::from(vec![0u8; 8])).unwrap_err();
    assert!(matches!(err, Error::SizeMismatch { expected: 12, actual: 8 }));
}

#[test]
fn test_with_strides_rank_checked() {
    let t = Tensor::zeros(ScalarDType::Float32, &[2, 3], Device::cpu());
    let transposed = t.clone().with_strides(&[1, 2]).unwrap();
    assert_eq!(transposed.strides(), &[1, 2]);
    assert!(transposed.is_same(&t));
    assert!(matches!(t.with_strides(&[1]), Err(Error::RankMismatch { sizes: 2, strides: 1 })));
}

#[test_case(Scalar::Bool(true); "bool")]
#[test_case(Scalar::Int(-7); "int")]
#[test_case(Scalar::UInt(u64::MAX); "uint")]
#[test_case(Scalar::Float(2.5); "float")]
#[test_case(Scalar::Complex { re: 1.0, im: -2.0 }; "complex")]
fn test_scalar_tensor_item(value: Scalar) {
    let t = Tensor::scalar(value, Device::cpu());
    assert_eq!(t.dim(), 0);
    assert_eq!(t.dtype(), value.dtype());
    assert_eq!(t.item().unwrap(), value);
}

#[test]
fn test_item_narrow_types() {
    let f = Tensor::from_vec(vec![0.5f32], &[], Device::cpu()).unwrap();
    assert_eq!(f.item().unwrap(), Scalar::Float(0.5));

    let i = Tensor::from_vec(vec![-3i8], &[1], Device::cpu()).unwrap();
    assert_eq!(i.item().unwrap(), Scalar::Int(-3));

    let half = Tensor::from_bytes(
        ScalarDType::Float16,
        &[],
        Device::cpu(),
        Arc::from(half::f16::from_f64(1.5).to_ne_bytes().to_vec()),
    )
    .unwrap();
    assert_eq!(half.item().unwrap(), Scalar::Float(1.5));
}

#[test]
fn test_item_requires_single_element() {
    let t = Tensor::zeros(ScalarDType::Float32, &[2], Device::cpu());
    assert!(matches!(t.item(), Err(Error::NotAScalar { numel: 2 })));
}

#[test]
fn test_key_set_follows_device() {
    let cpu = Tensor::zeros(ScalarDType::Float32, &[1], Device::cpu());
    assert!(cpu.key_set().contains(DispatchKey::Cpu));
    assert!(cpu.key_set().contains(DispatchKey::AutogradCpu));
    assert!(!cpu.key_set().contains(DispatchKey::Cuda));

    let cuda = Tensor::zeros(ScalarDType::Float32, &[1], Device::cuda(0)).with_extra_keys(DispatchKey::Python.into());
    assert!(cuda.key_set().contains(DispatchKey::Cuda));
    assert!(cuda.key_set().contains(DispatchKey::Python));
}
