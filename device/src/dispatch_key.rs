//! Dispatch keys and key sets.
//!
//! A dispatch key names one backend-specific or functionality-specific
//! implementation slot. The key set of a call is the union of its tensors'
//! keys filtered by thread-local include/exclude state; the cache compares
//! only the backend portion.

use enumset::{EnumSet, EnumSetType, enum_set};
use kiln_dtype::DeviceType;

#[derive(Debug, Hash, PartialOrd, Ord, EnumSetType, strum::Display, strum::EnumIter)]
#[enumset(repr = "u64")]
pub enum DispatchKey {
    // Backend components
    Cpu,
    Cuda,
    Metal,
    WebGpu,
    Meta,

    // Functionality
    AutogradCpu,
    AutogradCuda,
    AutogradMetal,
    AutocastCpu,
    AutocastCuda,
    Python,
}

pub type DispatchKeySet = EnumSet<DispatchKey>;

/// Keys that select a backend rather than a functionality layer.
pub const BACKEND_KEYS: DispatchKeySet = enum_set!(
    DispatchKey::Cpu | DispatchKey::Cuda | DispatchKey::Metal | DispatchKey::WebGpu | DispatchKey::Meta
);

impl DispatchKey {
    /// Device type a dispatch key routes to, or `None` for device-less keys.
    pub const fn device_type(self) -> Option<DeviceType> {
        match self {
            Self::Cpu | Self::AutogradCpu | Self::AutocastCpu => Some(DeviceType::Cpu),
            Self::Cuda | Self::AutogradCuda | Self::AutocastCuda => Some(DeviceType::Cuda),
            Self::Metal | Self::AutogradMetal => Some(DeviceType::Metal),
            Self::WebGpu => Some(DeviceType::WebGpu),
            Self::Meta => Some(DeviceType::Meta),
            Self::Python => None,
        }
    }

    pub const fn is_backend(self) -> bool {
        matches!(self, Self::Cpu | Self::Cuda | Self::Metal | Self::WebGpu | Self::Meta)
    }

    /// Backend key owning tensors of a device type.
    pub const fn backend(device: DeviceType) -> Self {
        match device {
            DeviceType::Cpu => Self::Cpu,
            DeviceType::Cuda => Self::Cuda,
            DeviceType::Metal => Self::Metal,
            DeviceType::WebGpu => Self::WebGpu,
            DeviceType::Meta => Self::Meta,
        }
    }

    /// Autograd key paired with a device type, if that device supports autograd.
    pub const fn autograd(device: DeviceType) -> Option<Self> {
        match device {
            DeviceType::Cpu => Some(Self::AutogradCpu),
            DeviceType::Cuda => Some(Self::AutogradCuda),
            DeviceType::Metal => Some(Self::AutogradMetal),
            DeviceType::WebGpu | DeviceType::Meta => None,
        }
    }
}

/// Backend portion of a key set.
pub fn backend_keys(keys: DispatchKeySet) -> DispatchKeySet {
    keys & BACKEND_KEYS
}

/// Default key set of a tensor living on `device`.
pub fn device_key_set(device: DeviceType) -> DispatchKeySet {
    let mut keys = EnumSet::only(DispatchKey::backend(device));
    if let Some(autograd) = DispatchKey::autograd(device) {
        keys.insert(autograd);
    }
    keys
}
