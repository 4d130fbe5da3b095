//! Android Toolchain Discovery
//!
//! Locates the Android SDK and resolves the executables the release
//! pipeline drives:
//! - `zipalign` and `apksigner` from a build-tools version
//! - `adb` from platform-tools

pub mod detector;

pub use detector::{executable_name, DetectionError, SdkInfo, SdkLocator, SdkSource};

/// Environment variables consulted for the SDK, in order
pub const SDK_ENV_VARS: &[&str] = &["ANDROID_SDK_ROOT", "ANDROID_HOME"];
