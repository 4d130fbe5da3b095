//! Build Descriptor
//!
//! Reads the values the release needs from the application module's
//! `build.gradle` (or `build.gradle.kts`).

use std::path::{Path, PathBuf};

use droid_release_core::PackageIdentifier;
use regex::Regex;
use tracing::{debug, info};

use crate::BuildError;

const DESCRIPTOR_FILES: &[&str] = &["build.gradle", "build.gradle.kts"];

/// Values extracted from a module build script
#[derive(Debug, Clone)]
pub struct BuildDescriptor {
    /// The script the values came from
    pub path: PathBuf,
    /// Raw `applicationId` value
    pub application_id: Option<String>,
    /// `buildToolsVersion`, absent in scripts relying on the AGP default
    pub build_tools_version: Option<String>,
}

impl BuildDescriptor {
    /// Read the descriptor of `module_dir`
    pub fn read(module_dir: &Path) -> Result<Self, BuildError> {
        let path = DESCRIPTOR_FILES
            .iter()
            .map(|name| module_dir.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| BuildError::DescriptorNotFound(module_dir.to_path_buf()))?;

        let contents = std::fs::read_to_string(&path)?;
        let descriptor = Self::parse(&path, &contents);
        debug!(
            "{:?}: applicationId={:?} buildToolsVersion={:?}",
            path, descriptor.application_id, descriptor.build_tools_version
        );
        Ok(descriptor)
    }

    /// Extract the values from build script text
    pub fn parse(path: &Path, contents: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            application_id: capture(r#"applicationId\s*=?\s*['"](.*?)['"]"#, contents),
            build_tools_version: capture(r#"buildToolsVersion\s*=?\s*['"]([0-9.]+)['"]"#, contents),
        }
    }

    /// The declared `applicationId` as a package identifier
    pub fn package(&self) -> Result<PackageIdentifier, BuildError> {
        info!("Extracting applicationId...");
        let raw = self.application_id.as_deref().ok_or_else(|| BuildError::MissingProperty {
            key: "applicationId",
            path: self.path.clone(),
        })?;
        Ok(PackageIdentifier::parse(raw)?)
    }
}

fn capture(pattern: &str, contents: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(contents)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GROOVY: &str = r#"
android {
    compileSdkVersion 29
    buildToolsVersion '29.0.3'
    defaultConfig {
        applicationId "com.example.demo"
        minSdkVersion 21
    }
}
"#;

    const KOTLIN: &str = r#"
android {
    buildToolsVersion = "34.0.0"
    defaultConfig {
        applicationId = "org.sample.kts"
    }
}
"#;

    #[test]
    fn test_parse_groovy_script() {
        let d = BuildDescriptor::parse(Path::new("build.gradle"), GROOVY);
        assert_eq!(d.application_id.as_deref(), Some("com.example.demo"));
        assert_eq!(d.build_tools_version.as_deref(), Some("29.0.3"));
        assert_eq!(d.package().unwrap().to_string(), "com.example.demo");
    }

    #[test]
    fn test_parse_kotlin_script() {
        let d = BuildDescriptor::parse(Path::new("build.gradle.kts"), KOTLIN);
        assert_eq!(d.application_id.as_deref(), Some("org.sample.kts"));
        assert_eq!(d.build_tools_version.as_deref(), Some("34.0.0"));
    }

    #[test]
    fn test_missing_application_id() {
        let d = BuildDescriptor::parse(Path::new("build.gradle"), "android {}\n");
        assert!(d.build_tools_version.is_none());
        assert!(matches!(
            d.package(),
            Err(BuildError::MissingProperty { key: "applicationId", .. })
        ));
    }

    #[test]
    fn test_read_prefers_groovy_and_falls_back_to_kts() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BuildDescriptor::read(dir.path()),
            Err(BuildError::DescriptorNotFound(_))
        ));

        fs::write(dir.path().join("build.gradle.kts"), KOTLIN).unwrap();
        let d = BuildDescriptor::read(dir.path()).unwrap();
        assert_eq!(d.path, dir.path().join("build.gradle.kts"));

        fs::write(dir.path().join("build.gradle"), GROOVY).unwrap();
        let d = BuildDescriptor::read(dir.path()).unwrap();
        assert_eq!(d.application_id.as_deref(), Some("com.example.demo"));
    }
}
