//! Device descriptors.
//!
//! A [`Device`] is a device type plus an optional ordinal. CPU devices are
//! index-independent for caching purposes; [`Device::normalized`] collapses
//! their ordinal to "no index".

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, UnknownDeviceTypeSnafu};

/// Device ordinal within one device type.
pub type DeviceIndex = u8;

/// Backend family of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DeviceType {
    Cpu,
    Cuda,
    Metal,
    WebGpu,
    /// Shape-only device with no storage.
    Meta,
}

impl DeviceType {
    /// Parse a device type name (`"cpu"`, `"CUDA"`, ...).
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| UnknownDeviceTypeSnafu { name }.build())
    }

    /// Canonical lowercase name, as handed to collaborators.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// A device type plus an optional ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Device {
    pub kind: DeviceType,
    /// `None` means "any / no index".
    pub index: Option<DeviceIndex>,
}

impl Device {
    pub const fn new(kind: DeviceType, index: Option<DeviceIndex>) -> Self {
        Self { kind, index }
    }

    pub const fn cpu() -> Self {
        Self::new(DeviceType::Cpu, None)
    }

    pub const fn cuda(index: DeviceIndex) -> Self {
        Self::new(DeviceType::Cuda, Some(index))
    }

    /// Build a device from a signed ordinal where any negative value means "no index".
    ///
    /// Returns `None` when the ordinal does not fit a [`DeviceIndex`].
    pub fn from_raw_index(kind: DeviceType, index: i64) -> Option<Self> {
        if index < 0 {
            return Some(Self::new(kind, None));
        }
        DeviceIndex::try_from(index).ok().map(|index| Self::new(kind, Some(index)))
    }

    pub const fn is_cpu(&self) -> bool {
        matches!(self.kind, DeviceType::Cpu)
    }

    /// Collapse the CPU ordinal; other device types keep theirs.
    pub const fn normalized(self) -> Self {
        match self.kind {
            DeviceType::Cpu => Self::new(DeviceType::Cpu, None),
            _ => self,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}:{}", self.kind, index),
            None => write!(f, "{}", self.kind),
        }
    }
}
