//! SDK Detection
//!
//! Finds an Android SDK installation and the tools inside it.

use std::cmp::Ordering;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use which::which;

use crate::SDK_ENV_VARS;

/// Toolchain detection errors
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Android SDK not found (set android_sdk_path, ANDROID_SDK_ROOT or ANDROID_HOME)")]
    SdkNotFound,
    #[error("Invalid SDK installation at {0}")]
    InvalidInstallation(PathBuf),
    #[error("build-tools {version} not installed in {path}")]
    BuildToolsNotFound { version: String, path: PathBuf },
    #[error("no build-tools installed in {0}")]
    NoBuildTools(PathBuf),
    #[error("adb not found in platform-tools or on PATH")]
    AdbNotFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where an SDK candidate came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkSource {
    Config,
    Env(&'static str),
    PlatformDefault,
}

impl fmt::Display for SdkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkSource::Config => f.write_str("configuration"),
            SdkSource::Env(name) => write!(f, "${}", name),
            SdkSource::PlatformDefault => f.write_str("platform default"),
        }
    }
}

/// Result of SDK detection
#[derive(Debug, Clone)]
pub struct SdkInfo {
    pub path: PathBuf,
    /// Installed build-tools versions, lowest first
    pub build_tools_versions: Vec<String>,
    pub has_platform_tools: bool,
}

impl SdkInfo {
    /// Inspect an SDK directory
    pub async fn analyze(path: &Path) -> Result<SdkInfo, DetectionError> {
        if !is_valid_sdk(path) {
            return Err(DetectionError::InvalidInstallation(path.to_path_buf()));
        }

        let mut build_tools_versions = Vec::new();
        let build_tools_dir = path.join("build-tools");
        if build_tools_dir.is_dir() {
            let mut entries = tokio::fs::read_dir(&build_tools_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.path().is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        build_tools_versions.push(name.to_string());
                    }
                }
            }
        }
        build_tools_versions.sort_by(|a, b| compare_versions(a, b));

        Ok(SdkInfo {
            path: path.to_path_buf(),
            build_tools_versions,
            has_platform_tools: path.join("platform-tools").is_dir(),
        })
    }

    /// Highest installed build-tools version
    pub fn latest_build_tools(&self) -> Option<&str> {
        self.build_tools_versions.last().map(String::as_str)
    }

    /// Directory of an installed build-tools version
    pub fn build_tools(&self, version: &str) -> Result<PathBuf, DetectionError> {
        let dir = self.path.join("build-tools").join(version);
        if !dir.is_dir() {
            return Err(DetectionError::BuildToolsNotFound {
                version: version.to_string(),
                path: self.path.clone(),
            });
        }
        Ok(dir)
    }

    /// Build-tools directory for `version`, or the latest one when `None`
    pub fn resolve_build_tools(&self, version: Option<&str>) -> Result<PathBuf, DetectionError> {
        match version {
            Some(version) => self.build_tools(version),
            None => {
                let latest = self
                    .latest_build_tools()
                    .ok_or_else(|| DetectionError::NoBuildTools(self.path.clone()))?;
                debug!("No buildToolsVersion given, using build-tools {}", latest);
                self.build_tools(latest)
            }
        }
    }

    /// Path of a build-tools executable such as `zipalign` or `apksigner`
    pub fn tool(&self, version: Option<&str>, name: &str) -> Result<PathBuf, DetectionError> {
        Ok(self.resolve_build_tools(version)?.join(executable_name(name)))
    }

    /// `adb` from platform-tools, falling back to `PATH`
    pub fn adb(&self) -> Result<PathBuf, DetectionError> {
        let bundled = self.path.join("platform-tools").join(executable_name("adb"));
        if bundled.is_file() {
            return Ok(bundled);
        }
        warn!("adb not found in {:?}, trying PATH", bundled.parent());
        which("adb").map_err(|_| DetectionError::AdbNotFound)
    }
}

/// Finds the SDK from config, environment and platform defaults
#[derive(Debug, Clone, Default)]
pub struct SdkLocator {
    explicit: Option<PathBuf>,
}

impl SdkLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a configured SDK path. It is authoritative: no fallback when invalid.
    pub fn with_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    /// Locate and analyze the SDK
    pub async fn locate(&self) -> Result<SdkInfo, DetectionError> {
        info!("Detecting Android SDK...");

        if let Some(path) = &self.explicit {
            let sdk = SdkInfo::analyze(path).await?;
            info!("Using Android SDK at {:?} (configuration)", path);
            return Ok(sdk);
        }

        for (source, path) in self.candidates_with(|name| env::var(name).ok()) {
            if is_valid_sdk(&path) {
                let sdk = SdkInfo::analyze(&path).await?;
                info!("Found Android SDK at {:?} ({})", path, source);
                return Ok(sdk);
            }
            debug!("No SDK at {:?} ({})", path, source);
        }

        Err(DetectionError::SdkNotFound)
    }

    /// Candidate paths in lookup order
    pub fn candidates_with<F>(&self, lookup: F) -> Vec<(SdkSource, PathBuf)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut candidates = Vec::new();

        if let Some(path) = &self.explicit {
            candidates.push((SdkSource::Config, path.clone()));
        }

        for &name in SDK_ENV_VARS {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                candidates.push((SdkSource::Env(name), PathBuf::from(value)));
            }
        }

        if let Some(path) = platform_default() {
            candidates.push((SdkSource::PlatformDefault, path));
        }

        candidates
    }
}

/// Default Android Studio SDK location for this platform
fn platform_default() -> Option<PathBuf> {
    if cfg!(windows) {
        dirs::data_local_dir().map(|local| local.join("Android").join("Sdk"))
    } else if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| home.join("Library").join("Android").join("sdk"))
    } else {
        dirs::home_dir().map(|home| home.join("Android").join("Sdk"))
    }
}

fn is_valid_sdk(path: &Path) -> bool {
    path.is_dir() && (path.join("build-tools").is_dir() || path.join("platform-tools").is_dir())
}

/// Host file name of an SDK executable
pub fn executable_name(name: &str) -> String {
    if !cfg!(windows) {
        return name.to_string();
    }
    match name {
        // Shell-script wrappers in build-tools
        "apksigner" | "d8" | "lint" => format!("{}.bat", name),
        _ => format!("{}.exe", name),
    }
}

/// Numeric comparison of dotted versions (`34.0.0` > `9.0.0`)
fn compare_versions(a: &str, b: &str) -> Ordering {
    fn key(v: &str) -> Vec<u64> {
        v.split(|c| c == '.' || c == '-')
            .map(|part| part.parse::<u64>().unwrap_or(0))
            .collect()
    }
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}
