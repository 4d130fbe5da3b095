//! Build Runner
//!
//! Coordinates the entire build process: Gradle, release signing, metadata
//! and publishing.

use std::path::{Path, PathBuf};
use std::time::Instant;

use droid_release_toolchain::SdkInfo;
use tracing::{debug, info, warn};

use crate::{
    ApkPublisher, ApkSigner, BuildConfig, BuildError, BuildVariant, GradleBuild, KeyStore,
    OutputMetadata,
};

/// Build output
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Published APK in the output folder
    pub path: PathBuf,
    /// APK the copy was taken from
    pub built: PathBuf,
    /// Build duration in seconds
    pub duration_secs: f64,
    /// APK size in bytes
    pub size: u64,
    /// Was signed by the release step
    pub signed: bool,
    /// Build variant used
    pub variant: BuildVariant,
    /// Gradle's output metadata, when present
    pub metadata: Option<OutputMetadata>,
}

/// Build runner that coordinates the build process
pub struct BuildRunner {
    config: BuildConfig,
    sdk: SdkInfo,
    build_tools_version: Option<String>,
    keystore: Option<KeyStore>,
}

impl BuildRunner {
    /// Create a new build runner
    pub fn new(config: BuildConfig, sdk: SdkInfo) -> Self {
        Self {
            config,
            sdk,
            build_tools_version: None,
            keystore: None,
        }
    }

    /// Build-tools version to sign with; the latest installed when unset
    pub fn with_build_tools_version(mut self, version: Option<String>) -> Self {
        self.build_tools_version = version;
        self
    }

    /// Keystore for release builds
    pub fn with_keystore(mut self, keystore: KeyStore) -> Self {
        self.keystore = Some(keystore);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Run the build
    pub async fn build(&self) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();
        let variant = self.config.variant;

        info!("Starting {} build for {:?}", variant.as_str(), self.config.project_dir);

        // Resolve signing before spending minutes in Gradle.
        let signing = match variant {
            BuildVariant::Release => Some(self.release_signer()?),
            BuildVariant::Debug => None,
        };

        let gradle = GradleBuild::new(self.config.clone()).with_android_home(self.sdk.path.clone());
        let output_dir = gradle.build().await?;

        let metadata = self.read_metadata(&output_dir)?;
        match &metadata {
            Some(meta) => meta.log(variant.as_str()),
            None => warn!("No output metadata found for the {} build", variant.as_str()),
        }

        let built = match signing {
            Some((signer, keystore)) => signer.sign_release(&output_dir, keystore).await?,
            None => locate_apk(&output_dir, metadata.as_ref())?,
        };

        let publisher = ApkPublisher::new(self.config.output_dir.clone());
        let path = publisher.publish(&built, variant.published_name())?;

        let duration = start.elapsed().as_secs_f64();
        let size = std::fs::metadata(&path)?.len();

        info!("Build completed in {:.2}s", duration);

        Ok(BuildOutput {
            path,
            built,
            duration_secs: duration,
            size,
            signed: variant == BuildVariant::Release,
            variant,
            metadata,
        })
    }

    fn release_signer(&self) -> Result<(ApkSigner, &KeyStore), BuildError> {
        let keystore = self
            .keystore
            .as_ref()
            .ok_or_else(|| BuildError::ConfigError("release builds need a signing keystore".into()))?;

        let version = self.build_tools_version.as_deref();
        let signer = ApkSigner::new(
            self.sdk.tool(version, "zipalign")?,
            self.sdk.tool(version, "apksigner")?,
        )
        .with_verbose(self.config.verbose);

        Ok((signer, keystore))
    }

    /// Metadata next to the APK, or in `<module>/<variant>` where older
    /// signing configs put it
    fn read_metadata(&self, output_dir: &Path) -> Result<Option<OutputMetadata>, BuildError> {
        if let Some(meta) = OutputMetadata::read(output_dir)? {
            return Ok(Some(meta));
        }
        OutputMetadata::read(&self.config.module_dir().join(self.config.variant.as_str()))
    }
}

/// The APK Gradle produced: the metadata's output file, else the first APK in `dir`
fn locate_apk(dir: &Path, metadata: Option<&OutputMetadata>) -> Result<PathBuf, BuildError> {
    if let Some(path) = metadata.and_then(OutputMetadata::apk_path) {
        if path.is_file() {
            return Ok(path);
        }
        debug!("Metadata points at missing {:?}", path);
    }

    let mut apks: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|ext| ext == "apk").unwrap_or(false))
        .collect();
    apks.sort();

    apks.into_iter()
        .next()
        .ok_or_else(|| BuildError::ApkNotFound(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sdk(path: &Path) -> SdkInfo {
        SdkInfo {
            path: path.to_path_buf(),
            build_tools_versions: vec!["30.0.3".to_string()],
            has_platform_tools: false,
        }
    }

    fn config(project: &Path, variant: BuildVariant) -> BuildConfig {
        BuildConfig {
            project_dir: project.to_path_buf(),
            variant,
            output_dir: project.join("generated"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_release_without_keystore_fails_before_gradle() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BuildRunner::new(config(dir.path(), BuildVariant::Release), sdk(dir.path()));

        assert!(matches!(runner.build().await, Err(BuildError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_release_with_missing_build_tools() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BuildRunner::new(config(dir.path(), BuildVariant::Release), sdk(dir.path()))
            .with_keystore(KeyStore::new(dir.path().join("k.jks"), "a", "b"))
            .with_build_tools_version(Some("99.0.0".to_string()));

        assert!(matches!(runner.build().await, Err(BuildError::Toolchain(_))));
    }

    #[tokio::test]
    async fn test_debug_build_without_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BuildRunner::new(config(dir.path(), BuildVariant::Debug), sdk(dir.path()));

        assert!(matches!(
            runner.build().await,
            Err(BuildError::ToolchainNotFound(_))
        ));
    }

    #[test]
    fn test_locate_apk_prefers_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a-first.apk"), b"1").unwrap();
        fs::write(dir.path().join("app-debug.apk"), b"2").unwrap();
        fs::write(dir.path().join("output.json"), "[]").unwrap();

        assert_eq!(locate_apk(dir.path(), None).unwrap(), dir.path().join("a-first.apk"));

        let meta = OutputMetadata::parse_legacy(
            &dir.path().join("output.json"),
            r#"[{"apkInfo": {"versionCode": 1}, "path": "app-debug.apk"}]"#,
        )
        .unwrap();
        assert_eq!(
            locate_apk(dir.path(), Some(&meta)).unwrap(),
            dir.path().join("app-debug.apk")
        );
    }

    #[test]
    fn test_locate_apk_in_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            locate_apk(dir.path(), None),
            Err(BuildError::ApkNotFound(_))
        ));
    }

    #[test]
    fn test_metadata_fallback_to_module_variant_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = BuildRunner::new(config(dir.path(), BuildVariant::Release), sdk(dir.path()));
        let output_dir = runner.config().apk_output_dir();
        fs::create_dir_all(&output_dir).unwrap();
        let legacy = dir.path().join("app/release");
        fs::create_dir_all(&legacy).unwrap();
        fs::write(
            legacy.join("output.json"),
            r#"[{"apkInfo": {"versionCode": 5, "versionName": "2.0"}, "path": "app-release.apk"}]"#,
        )
        .unwrap();

        let meta = runner.read_metadata(&output_dir).unwrap().unwrap();
        assert_eq!(meta.version_code, Some(5));
    }
}
