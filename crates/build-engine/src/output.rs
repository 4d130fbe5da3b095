//! Build Outputs
//!
//! Reads the metadata Gradle writes next to an APK and copies the APK into
//! the release output folder.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::BuildError;

/// Metadata file written by current Android Gradle Plugin versions
pub const MODERN_METADATA_FILE: &str = "output-metadata.json";
/// Metadata file written by older Android Gradle Plugin versions
pub const LEGACY_METADATA_FILE: &str = "output.json";

/// What Gradle reports about a built APK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMetadata {
    /// The metadata file this was read from
    pub source: PathBuf,
    pub variant: Option<String>,
    pub application_id: Option<String>,
    pub version_code: Option<u64>,
    pub version_name: Option<String>,
    /// APK file name, relative to the metadata file
    pub output_file: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModernMetadata {
    #[serde(default)]
    variant_name: Option<String>,
    #[serde(default)]
    application_id: Option<String>,
    #[serde(default)]
    elements: Vec<ModernElement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModernElement {
    #[serde(default)]
    version_code: Option<u64>,
    #[serde(default)]
    version_name: Option<String>,
    #[serde(default)]
    output_file: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyEntry {
    #[serde(default, alias = "apkData")]
    apk_info: Option<LegacyApkInfo>,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyApkInfo {
    #[serde(default)]
    version_code: Option<u64>,
    #[serde(default)]
    version_name: Option<String>,
    #[serde(default)]
    output_file: Option<String>,
}

impl OutputMetadata {
    /// Read the metadata in `dir`, preferring the modern file.
    /// Returns `None` when neither file exists.
    pub fn read(dir: &Path) -> Result<Option<Self>, BuildError> {
        let modern = dir.join(MODERN_METADATA_FILE);
        if modern.is_file() {
            let contents = fs::read_to_string(&modern)?;
            return Self::parse_modern(&modern, &contents).map(Some);
        }

        let legacy = dir.join(LEGACY_METADATA_FILE);
        if legacy.is_file() {
            let contents = fs::read_to_string(&legacy)?;
            return Self::parse_legacy(&legacy, &contents).map(Some);
        }

        debug!("No output metadata in {:?}", dir);
        Ok(None)
    }

    /// `{"variantName": ..., "elements": [{"versionCode", "versionName", "outputFile"}]}`
    pub fn parse_modern(source: &Path, contents: &str) -> Result<Self, BuildError> {
        let parsed: ModernMetadata = serde_json::from_str(contents).map_err(|e| metadata_error(source, e))?;
        let element = parsed.elements.into_iter().next();

        Ok(Self {
            source: source.to_path_buf(),
            variant: parsed.variant_name,
            application_id: parsed.application_id,
            version_code: element.as_ref().and_then(|e| e.version_code),
            version_name: element.as_ref().and_then(|e| e.version_name.clone()),
            output_file: element.and_then(|e| e.output_file),
        })
    }

    /// `[{"apkInfo": {"versionCode", "versionName"}, "path": ...}]`
    pub fn parse_legacy(source: &Path, contents: &str) -> Result<Self, BuildError> {
        let entries: Vec<LegacyEntry> = serde_json::from_str(contents).map_err(|e| metadata_error(source, e))?;
        let entry = entries.into_iter().next();
        let info = entry.as_ref().and_then(|e| e.apk_info.as_ref());

        Ok(Self {
            source: source.to_path_buf(),
            variant: None,
            application_id: None,
            version_code: info.and_then(|i| i.version_code),
            version_name: info.and_then(|i| i.version_name.clone()),
            output_file: entry
                .as_ref()
                .and_then(|e| e.path.clone())
                .or_else(|| info.and_then(|i| i.output_file.clone())),
        })
    }

    /// Absolute path of the APK the metadata describes
    pub fn apk_path(&self) -> Option<PathBuf> {
        let file = self.output_file.as_ref()?;
        Some(self.source.parent().unwrap_or(Path::new("")).join(file))
    }

    /// Log the build information
    pub fn log(&self, variant: &str) {
        info!("Build type: {}", self.variant.as_deref().unwrap_or(variant));
        if let Some(code) = self.version_code {
            info!("Version code: {}", code);
        }
        if let Some(name) = &self.version_name {
            info!("Version name: {}", name);
        }
    }
}

fn metadata_error(path: &Path, source: serde_json::Error) -> BuildError {
    BuildError::Metadata {
        path: path.to_path_buf(),
        source,
    }
}

/// Copies finished APKs into the output folder
#[derive(Debug, Clone)]
pub struct ApkPublisher {
    output_dir: PathBuf,
}

impl ApkPublisher {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Copy `apk` to `<output_dir>/<name>`, replacing an existing file
    pub fn publish(&self, apk: &Path, name: &str) -> Result<PathBuf, BuildError> {
        info!("Starting APK copy...");

        if !apk.is_file() {
            return Err(BuildError::ApkNotFound(apk.to_path_buf()));
        }

        fs::create_dir_all(&self.output_dir)?;

        let destination = self.output_dir.join(name);
        if destination.exists() {
            debug!("Destination APK already exists, replacing {:?}", destination);
            fs::remove_file(&destination)?;
        }

        fs::copy(apk, &destination)?;
        info!("✓ APK copied to {:?}", destination);
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN: &str = r#"{
        "version": 3,
        "artifactType": {"type": "APK", "kind": "Directory"},
        "applicationId": "com.example.demo",
        "variantName": "release",
        "elements": [
            {"type": "SINGLE", "versionCode": 12, "versionName": "1.4.0", "outputFile": "app-release-unsigned.apk"}
        ]
    }"#;

    const LEGACY: &str = r#"[
        {"outputType": {"type": "APK"}, "apkInfo": {"type": "MAIN", "versionCode": 3, "versionName": "0.9"}, "path": "app-debug.apk"}
    ]"#;

    #[test]
    fn test_parse_modern_metadata() {
        let meta = OutputMetadata::parse_modern(Path::new("/out/output-metadata.json"), MODERN).unwrap();
        assert_eq!(meta.variant.as_deref(), Some("release"));
        assert_eq!(meta.application_id.as_deref(), Some("com.example.demo"));
        assert_eq!(meta.version_code, Some(12));
        assert_eq!(meta.version_name.as_deref(), Some("1.4.0"));
        assert_eq!(meta.apk_path(), Some(PathBuf::from("/out/app-release-unsigned.apk")));
    }

    #[test]
    fn test_parse_legacy_metadata() {
        let meta = OutputMetadata::parse_legacy(Path::new("/out/output.json"), LEGACY).unwrap();
        assert_eq!(meta.version_code, Some(3));
        assert_eq!(meta.version_name.as_deref(), Some("0.9"));
        assert_eq!(meta.apk_path(), Some(PathBuf::from("/out/app-debug.apk")));
    }

    #[test]
    fn test_read_prefers_modern_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(OutputMetadata::read(dir.path()).unwrap(), None);

        fs::write(dir.path().join(LEGACY_METADATA_FILE), LEGACY).unwrap();
        let meta = OutputMetadata::read(dir.path()).unwrap().unwrap();
        assert_eq!(meta.version_code, Some(3));

        fs::write(dir.path().join(MODERN_METADATA_FILE), MODERN).unwrap();
        let meta = OutputMetadata::read(dir.path()).unwrap().unwrap();
        assert_eq!(meta.version_code, Some(12));
    }

    #[test]
    fn test_malformed_metadata_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LEGACY_METADATA_FILE), "{not json").unwrap();
        assert!(matches!(
            OutputMetadata::read(dir.path()),
            Err(BuildError::Metadata { .. })
        ));
    }

    #[test]
    fn test_publish_creates_folder_and_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let apk = dir.path().join("apk-release.apk");
        fs::write(&apk, b"signed").unwrap();

        let publisher = ApkPublisher::new(dir.path().join("generated"));
        let first = publisher.publish(&apk, "app-release.apk").unwrap();
        assert_eq!(fs::read(&first).unwrap(), b"signed");

        fs::write(&apk, b"signed again").unwrap();
        let second = publisher.publish(&apk, "app-release.apk").unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), b"signed again");
    }

    #[test]
    fn test_publish_missing_apk() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ApkPublisher::new(dir.path().join("generated"));
        assert!(matches!(
            publisher.publish(&dir.path().join("missing.apk"), "debug.apk"),
            Err(BuildError::ApkNotFound(_))
        ));
        assert!(!dir.path().join("generated").exists());
    }
}
