//! Build Configuration
//!
//! Defines build settings and variants.

use std::path::PathBuf;

use droid_release_core::{BuildType, ReleaseConfig};
use serde::{Deserialize, Serialize};

/// Build variant (debug/release)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildVariant {
    #[default]
    Debug,
    Release,
}

impl BuildVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildVariant::Debug => "debug",
            BuildVariant::Release => "release",
        }
    }

    pub fn gradle_task_suffix(&self) -> &'static str {
        match self {
            BuildVariant::Debug => "Debug",
            BuildVariant::Release => "Release",
        }
    }

    /// `assembleDebug` / `assembleRelease`
    pub fn gradle_task(&self) -> String {
        format!("assemble{}", self.gradle_task_suffix())
    }

    /// File name of the APK copied into the output folder
    pub fn published_name(&self) -> &'static str {
        match self {
            BuildVariant::Debug => "debug.apk",
            BuildVariant::Release => "app-release.apk",
        }
    }
}

impl From<BuildType> for BuildVariant {
    fn from(build_type: BuildType) -> Self {
        match build_type {
            BuildType::Debug => BuildVariant::Debug,
            BuildType::Release => BuildVariant::Release,
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Gradle project root
    pub project_dir: PathBuf,

    /// Application module
    pub module: String,

    /// Build variant
    pub variant: BuildVariant,

    /// Where the final APK is published
    pub output_dir: PathBuf,

    /// Pass `-v` to zipalign and apksigner
    pub verbose: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            module: "app".to_string(),
            variant: BuildVariant::Debug,
            output_dir: PathBuf::from("generated"),
            verbose: false,
        }
    }
}

impl BuildConfig {
    /// Create from a loaded release configuration
    pub fn from_release_config(config: &ReleaseConfig) -> Self {
        Self {
            project_dir: config.application_path.clone(),
            module: config.module.clone(),
            variant: config.build_type.into(),
            output_dir: config.output_path.clone(),
            ..Default::default()
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Module directory under the project root
    pub fn module_dir(&self) -> PathBuf {
        self.project_dir.join(&self.module)
    }

    /// `<module>/build/outputs/apk/<variant>`
    pub fn apk_output_dir(&self) -> PathBuf {
        self.module_dir()
            .join("build")
            .join("outputs")
            .join("apk")
            .join(self.variant.as_str())
    }

    /// Final location of the published APK
    pub fn published_path(&self) -> PathBuf {
        self.output_dir.join(self.variant.published_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_tasks_and_names() {
        assert_eq!(BuildVariant::Release.gradle_task(), "assembleRelease");
        assert_eq!(BuildVariant::Debug.gradle_task(), "assembleDebug");
        assert_eq!(BuildVariant::Release.published_name(), "app-release.apk");
        assert_eq!(BuildVariant::Debug.published_name(), "debug.apk");
    }

    #[test]
    fn test_paths_from_release_config() {
        let mut release = ReleaseConfig::new("/work/demo");
        release.build_type = BuildType::Release;
        release.module = "mobile".to_string();

        let config = BuildConfig::from_release_config(&release);

        assert_eq!(config.variant, BuildVariant::Release);
        assert_eq!(
            config.apk_output_dir(),
            PathBuf::from("/work/demo/mobile/build/outputs/apk/release")
        );
        assert_eq!(config.published_path(), PathBuf::from("generated/app-release.apk"));
    }
}
