//! Android Build Engine
//!
//! Builds an Android application with its Gradle wrapper, signs release
//! APKs with the SDK build-tools and publishes the result.

pub mod config;
pub mod descriptor;
pub mod gradle_build;
pub mod output;
pub mod signing;
pub mod runner;

pub use config::{BuildConfig, BuildVariant};
pub use descriptor::BuildDescriptor;
pub use gradle_build::GradleBuild;
pub use output::{ApkPublisher, OutputMetadata};
pub use signing::{ApkSigner, KeyStore};
pub use runner::{BuildOutput, BuildRunner};

use std::path::PathBuf;

use droid_release_core::ReleaseError;
use droid_release_toolchain::DetectionError;

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Build failed: {0}")]
    BuildFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Toolchain not found: {0}")]
    ToolchainNotFound(String),
    #[error("Signing error: {0}")]
    SigningError(String),
    #[error("Build descriptor not found in {0}")]
    DescriptorNotFound(PathBuf),
    #[error("{key} not found in {path}")]
    MissingProperty { key: &'static str, path: PathBuf },
    #[error("Invalid output metadata {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("APK not found: {0}")]
    ApkNotFound(PathBuf),
    #[error(transparent)]
    Toolchain(#[from] DetectionError),
    #[error(transparent)]
    Core(#[from] ReleaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
