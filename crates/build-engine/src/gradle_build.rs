//! Gradle Build
//!
//! Runs the project's Gradle wrapper to assemble an APK.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info};

use crate::{BuildConfig, BuildError};

/// Lines of Gradle output kept in a `BuildFailed` error
const FAILURE_TAIL_LINES: usize = 40;

/// Gradle build for Android
pub struct GradleBuild {
    config: BuildConfig,
    android_home: Option<PathBuf>,
}

impl GradleBuild {
    /// Create a new Gradle builder
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            android_home: None,
        }
    }

    /// Set ANDROID_HOME
    pub fn with_android_home(mut self, path: PathBuf) -> Self {
        self.android_home = Some(path);
        self
    }

    /// Get gradlew path
    pub fn gradlew_path(&self) -> PathBuf {
        let wrapper_name = if cfg!(windows) {
            "gradlew.bat"
        } else {
            "gradlew"
        };
        self.config.project_dir.join(wrapper_name)
    }

    /// Check if Gradle wrapper exists
    pub fn has_gradle_wrapper(&self) -> bool {
        self.gradlew_path().is_file()
    }

    /// Wrapper arguments: `-p <root> assemble<Variant>`
    pub fn args(&self) -> Vec<String> {
        vec![
            "-p".to_string(),
            self.config.project_dir.to_string_lossy().to_string(),
            self.config.variant.gradle_task(),
        ]
    }

    /// Build the project, returning the APK output directory
    pub async fn build(&self) -> Result<PathBuf, BuildError> {
        if !self.has_gradle_wrapper() {
            return Err(BuildError::ToolchainNotFound(format!(
                "Gradle wrapper not found at {:?}",
                self.gradlew_path()
            )));
        }

        info!("Building {} with Gradle...", self.config.variant.as_str());

        let args = self.args();
        debug!("Running: gradlew {:?}", args);

        let mut cmd = Command::new(self.gradlew_path());
        cmd.current_dir(&self.config.project_dir);
        cmd.args(&args);

        if let Some(ref android_home) = self.android_home {
            cmd.env("ANDROID_HOME", android_home);
            cmd.env("ANDROID_SDK_ROOT", android_home);
        }

        let output = cmd.output().await?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::BuildFailed(format!(
                "{} exited with {}\n{}\n{}",
                self.config.variant.gradle_task(),
                output.status,
                tail(&stdout, FAILURE_TAIL_LINES),
                tail(&stderr, FAILURE_TAIL_LINES)
            )));
        }

        info!("Gradle build completed successfully");

        let output_dir = self.config.apk_output_dir();
        if !output_dir.is_dir() {
            return Err(BuildError::BuildFailed(format!(
                "Gradle succeeded but {:?} does not exist",
                output_dir
            )));
        }
        Ok(output_dir)
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuildVariant;

    fn config(dir: &std::path::Path, variant: BuildVariant) -> BuildConfig {
        BuildConfig {
            project_dir: dir.to_path_buf(),
            variant,
            ..Default::default()
        }
    }

    #[test]
    fn test_args_point_gradle_at_project() {
        let config = config(std::path::Path::new("/work/demo"), BuildVariant::Release);

        let args = GradleBuild::new(config).args();
        assert_eq!(args, vec!["-p", "/work/demo", "assembleRelease"]);
    }

    #[tokio::test]
    async fn test_missing_wrapper_is_toolchain_error() {
        let dir = tempfile::tempdir().unwrap();
        let build = GradleBuild::new(config(dir.path(), BuildVariant::Debug));

        assert!(!build.has_gradle_wrapper());
        assert!(matches!(
            build.build().await,
            Err(BuildError::ToolchainNotFound(_))
        ));
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("only", 5), "only");
    }
}
