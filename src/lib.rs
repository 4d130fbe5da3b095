//! droid-release - Android release automation
//!
//! Takes an Android Gradle project from source to a running app:
//! launcher icons, package rename, Gradle build, release signing,
//! publishing and install on a connected device.
//!
//! ## Architecture
//!
//! - `droid-release-core`: configuration, package identifiers and progress events
//! - `droid-release-rename`: package rename engine
//! - `droid-release-toolchain`: Android SDK and build-tools discovery
//! - `droid-release-build`: Gradle build, zipalign/apksigner signing and publishing
//! - `droid-release-device`: adb install and launch
//! - `droid-release-icons`: launcher icon generation

#![warn(clippy::all)]

pub mod cli;
pub mod commands;
pub mod pipeline;

pub use droid_release_core as core;
pub use droid_release_rename as rename;
pub use droid_release_toolchain as toolchain;
pub use droid_release_build as build;
pub use droid_release_device as device;
pub use droid_release_icons as icons;

/// Prelude module for convenient imports
pub mod prelude {
    pub use droid_release_core::{EventBus, PackageIdentifier, ReleaseConfig, ReleaseEvent};
    pub use droid_release_rename::{rename_package, RenameWorkflow, SourceLayout};
    pub use droid_release_toolchain::{SdkInfo, SdkLocator};
    pub use droid_release_build::{BuildConfig, BuildRunner};
    pub use droid_release_device::AdbClient;
    pub use droid_release_icons::LauncherIcons;

    pub use crate::pipeline::{ReleasePipeline, ReleaseSummary};
}
