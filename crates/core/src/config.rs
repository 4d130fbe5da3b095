//! Release Configuration
//!
//! Loads the `configuration.json` that drives a release:
//! - Project location and Gradle module
//! - Optional launcher icon and package rename
//! - Build type and signing credentials
//! - Output folder and install behaviour

use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ReleaseError, Result};
use crate::identifier::PackageIdentifier;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "configuration.json";

/// Build type to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    #[default]
    Debug,
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Release => "release",
        }
    }
}

/// Signing credentials for release builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningSettings {
    pub keystore_path: PathBuf,
    pub keystore_password: String,
    pub key_password: String,
    pub key_alias: Option<String>,
}

/// Main release configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Root of the Gradle project
    pub application_path: PathBuf,
    /// Source image for the launcher icons
    #[serde(default)]
    pub application_icon_path: Option<PathBuf>,
    /// Package name the application should end up with
    #[serde(default)]
    pub application_package_name: Option<PackageIdentifier>,
    /// Build type
    #[serde(default)]
    pub build_type: BuildType,
    /// Release keystore
    #[serde(default)]
    pub signing_keystore_path: Option<PathBuf>,
    /// Release keystore password
    #[serde(default)]
    pub signing_keystore_password: Option<String>,
    /// Release key password
    #[serde(default)]
    pub signing_password: Option<String>,
    /// Release key alias
    #[serde(default)]
    pub signing_key_alias: Option<String>,
    /// Gradle application module
    #[serde(default = "default_module")]
    pub module: String,
    /// Folder the final APK is copied into
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Android SDK location, overriding discovery
    #[serde(default)]
    pub android_sdk_path: Option<PathBuf>,
    /// Install and launch on a connected device after building
    #[serde(default = "default_true")]
    pub install: bool,
}

fn default_module() -> String { "app".to_string() }
fn default_output_path() -> PathBuf { PathBuf::from("generated") }
fn default_true() -> bool { true }

impl ReleaseConfig {
    /// Create a configuration for a project with every optional stage disabled
    pub fn new(application_path: impl Into<PathBuf>) -> Self {
        Self {
            application_path: application_path.into(),
            application_icon_path: None,
            application_package_name: None,
            build_type: BuildType::default(),
            signing_keystore_path: None,
            signing_keystore_password: None,
            signing_password: None,
            signing_key_alias: None,
            module: default_module(),
            output_path: default_output_path(),
            android_sdk_path: None,
            install: true,
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Reading configuration from {:?}", path);

        let contents = std::fs::read_to_string(path).map_err(|source| ReleaseError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path.extension().map(|e| e == "toml").unwrap_or(false);
        let config = if is_toml {
            Self::from_toml_str(&contents)?
        } else {
            Self::from_json_str(&contents)?
        };

        debug!("Loaded configuration: {:?}", config.redacted());
        Ok(config)
    }

    /// Parse configuration from a JSON document
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: ReleaseConfig = serde_json::from_str(contents)?;
        config.finish()
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ReleaseConfig = toml::from_str(contents)?;
        config.finish()
    }

    fn finish(mut self) -> Result<Self> {
        self.normalize_paths();
        self.validate()?;
        Ok(self)
    }

    /// Rewrite `\` separators in every path value to the host separator
    fn normalize_paths(&mut self) {
        self.application_path = normalize_path(&self.application_path);
        self.output_path = normalize_path(&self.output_path);
        for path in [
            &mut self.application_icon_path,
            &mut self.signing_keystore_path,
            &mut self.android_sdk_path,
        ]
        .into_iter()
        .flatten()
        {
            *path = normalize_path(path);
        }
    }

    /// Check cross-field requirements
    pub fn validate(&self) -> Result<()> {
        if self.application_path.as_os_str().is_empty() {
            return Err(ReleaseError::Config("application_path must not be empty".into()));
        }
        if self.module.is_empty() {
            return Err(ReleaseError::Config("module must not be empty".into()));
        }
        if self.build_type == BuildType::Release {
            self.signing()?;
        }
        Ok(())
    }

    /// Signing credentials, required for release builds
    pub fn signing(&self) -> Result<SigningSettings> {
        let missing = |key: &str| ReleaseError::Config(format!("{} is required for release builds", key));

        Ok(SigningSettings {
            keystore_path: self
                .signing_keystore_path
                .clone()
                .ok_or_else(|| missing("signing_keystore_path"))?,
            keystore_password: self
                .signing_keystore_password
                .clone()
                .ok_or_else(|| missing("signing_keystore_password"))?,
            key_password: self
                .signing_password
                .clone()
                .ok_or_else(|| missing("signing_password"))?,
            key_alias: self.signing_key_alias.clone(),
        })
    }

    /// Gradle module directory
    pub fn module_dir(&self) -> PathBuf {
        self.application_path.join(&self.module)
    }

    /// Copy of the configuration with secrets masked, for logging
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "******".to_string());
        Self {
            signing_keystore_password: mask(&self.signing_keystore_password),
            signing_password: mask(&self.signing_password),
            ..self.clone()
        }
    }
}

/// Replace Windows-style separators with the host separator
pub fn normalize_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(raw.replace('\\', &MAIN_SEPARATOR.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "application_path": "projects\\demo",
        "application_icon_path": "assets\\icon.png",
        "application_package_name": "com.example.renamed",
        "build_type": "release",
        "signing_keystore_path": "keys\\release.jks",
        "signing_keystore_password": "store-secret",
        "signing_password": "key-secret"
    }"#;

    #[test]
    fn test_parse_json_with_defaults() {
        let config = ReleaseConfig::from_json_str(SAMPLE).unwrap();

        assert_eq!(config.build_type, BuildType::Release);
        assert_eq!(config.module, "app");
        assert_eq!(config.output_path, PathBuf::from("generated"));
        assert!(config.install);
        assert_eq!(
            config.application_package_name.as_ref().map(|p| p.to_string()),
            Some("com.example.renamed".to_string())
        );

        let signing = config.signing().unwrap();
        assert_eq!(signing.keystore_password, "store-secret");
        assert_eq!(signing.key_alias, None);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_paths_are_normalized() {
        let config = ReleaseConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.application_path, PathBuf::from("projects/demo"));
        assert_eq!(config.application_icon_path, Some(PathBuf::from("assets/icon.png")));
        assert_eq!(config.signing_keystore_path, Some(PathBuf::from("keys/release.jks")));
        assert_eq!(config.module_dir(), PathBuf::from("projects/demo/app"));
    }

    #[test]
    fn test_release_requires_signing() {
        let err = ReleaseConfig::from_json_str(
            r#"{ "application_path": "demo", "build_type": "release" }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReleaseError::Config(_)));
    }

    #[test]
    fn test_invalid_package_name_rejected() {
        let result = ReleaseConfig::from_json_str(
            r#"{ "application_path": "demo", "application_package_name": "com..demo" }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        std::fs::write(
            &path,
            "application_path = \"demo\"\nbuild_type = \"debug\"\ninstall = false\n",
        )
        .unwrap();

        let config = ReleaseConfig::load(&path).unwrap();
        assert_eq!(config.build_type, BuildType::Debug);
        assert!(!config.install);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ReleaseConfig::load(Path::new("does-not-exist.json")).unwrap_err();
        assert!(err.to_string().contains("does-not-exist.json"));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let config = ReleaseConfig::from_json_str(SAMPLE).unwrap().redacted();
        assert_eq!(config.signing_password.as_deref(), Some("******"));
        assert!(!format!("{:?}", config).contains("store-secret"));
    }
}
