//! Android Device Bridge
//!
//! Installs and launches builds on connected devices through `adb`.

pub mod adb;
pub mod device;

pub use adb::{AdbClient, AdbError};
pub use device::{Device, DeviceState, DeviceType};

/// Intent category `monkey` uses to find the launcher activity
pub const LAUNCHER_CATEGORY: &str = "android.intent.category.LAUNCHER";
