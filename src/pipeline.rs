//! Release Pipeline
//!
//! Runs the release stages in order:
//!
//! 1. launcher icons, when an icon is configured
//! 2. package rename, when a package name is configured
//! 3. Gradle build, release signing and APK publishing
//! 4. install and launch on a connected device
//!
//! Every stage reports start, completion and failure on the event bus.
//! Install failures are reported but never fail the release.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use droid_release_build::{BuildConfig, BuildDescriptor, BuildOutput, BuildRunner, KeyStore};
use droid_release_core::{BuildType, EventBus, PackageIdentifier, ProgressSink, ReleaseConfig};
use droid_release_device::AdbClient;
use droid_release_icons::{GeneratedIcon, LauncherIcons};
use droid_release_rename::{RenameOperation, RenameOutcome, RenameWorkflow, SourceLayout};
use droid_release_toolchain::{SdkInfo, SdkLocator};

pub const STAGE_ICONS: &str = "icons";
pub const STAGE_RENAME: &str = "rename";
pub const STAGE_BUILD: &str = "build";
pub const STAGE_INSTALL: &str = "install";

/// What a full release produced
#[derive(Debug)]
pub struct ReleaseSummary {
    pub icons: Option<Vec<GeneratedIcon>>,
    pub rename: Option<RenameOutcome>,
    pub build: BuildOutput,
    pub installed: bool,
}

impl ReleaseSummary {
    /// Log a short report of the release
    pub fn log(&self) {
        if let Some(icons) = &self.icons {
            info!("Launcher icons: {} densities", icons.len());
        }
        if let Some(rename) = &self.rename {
            if rename.unchanged {
                info!("Package name: unchanged");
            } else {
                info!(
                    "Package name: {} files rewritten, {} entries moved",
                    rename.rewrite.rewritten.len(),
                    rename.restructure.moved.len()
                );
            }
        }
        info!(
            "APK: {:?} ({} bytes, {}, {:.1}s)",
            self.build.path,
            self.build.size,
            self.build.variant.as_str(),
            self.build.duration_secs
        );
        if self.installed {
            info!("Installed and launched on device");
        }
    }
}

/// The release pipeline for one configuration
pub struct ReleasePipeline {
    config: ReleaseConfig,
    bus: Arc<EventBus>,
    verbose: bool,
    sdk: OnceCell<SdkInfo>,
}

impl ReleasePipeline {
    pub fn new(config: ReleaseConfig, bus: Arc<EventBus>) -> Self {
        Self {
            config,
            bus,
            verbose: false,
            sdk: OnceCell::new(),
        }
    }

    /// Verbose signing tool output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Run every configured stage
    pub async fn run(&self) -> Result<ReleaseSummary> {
        info!("Starting release of {:?}", self.config.application_path);

        let icons = self.generate_icons(None).await?;
        let rename = self.rename(None, None).await?;
        let build = self.build().await?;

        let installed = if self.config.install {
            self.install(&build).await
        } else {
            debug!("Install disabled by configuration");
            false
        };

        Ok(ReleaseSummary {
            icons,
            rename,
            build,
            installed,
        })
    }

    /// Generate launcher icons from `icon`, or the configured icon.
    /// `None` when no icon is available.
    pub async fn generate_icons(&self, icon: Option<&Path>) -> Result<Option<Vec<GeneratedIcon>>> {
        let Some(icon) = icon.or(self.config.application_icon_path.as_deref()) else {
            debug!("No application icon configured, skipping icons");
            return Ok(None);
        };

        self.bus.stage_started(STAGE_ICONS);
        let result = self.run_icons(icon.to_path_buf()).await;
        self.report(STAGE_ICONS, result).map(Some)
    }

    async fn run_icons(&self, icon: PathBuf) -> Result<Vec<GeneratedIcon>> {
        let res_dir = droid_release_icons::res_dir(&self.config.module_dir());
        let icons = tokio::task::spawn_blocking(move || LauncherIcons::new().generate(&icon, &res_dir))
            .await
            .context("icon task did not complete")?
            .context("generating launcher icons")?;
        Ok(icons)
    }

    /// Rename the application package to `to`, or the configured package.
    /// The current package defaults to the build script's `applicationId`.
    /// `None` when no target package is available.
    pub async fn rename(
        &self,
        from: Option<PackageIdentifier>,
        to: Option<PackageIdentifier>,
    ) -> Result<Option<RenameOutcome>> {
        let Some(new) = to.or_else(|| self.config.application_package_name.clone()) else {
            debug!("No package name configured, skipping rename");
            return Ok(None);
        };

        self.bus.stage_started(STAGE_RENAME);
        let result = self.run_rename(from, new).await;
        self.report(STAGE_RENAME, result).map(Some)
    }

    async fn run_rename(&self, from: Option<PackageIdentifier>, new: PackageIdentifier) -> Result<RenameOutcome> {
        let old = match from {
            Some(old) => old,
            None => BuildDescriptor::read(&self.config.module_dir())?.package()?,
        };

        let operation = RenameOperation::new(&self.config.application_path, old, new);
        let layout = SourceLayout::for_module(&self.config.module);
        let sink: Arc<dyn ProgressSink> = self.bus.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            RenameWorkflow::new(operation, layout).with_sink(sink).run()
        })
        .await
        .context("rename task did not complete")??;

        Ok(outcome)
    }

    /// Build, sign (release) and publish the APK
    pub async fn build(&self) -> Result<BuildOutput> {
        self.bus.stage_started(STAGE_BUILD);
        let result = self.run_build().await;
        self.report(STAGE_BUILD, result)
    }

    async fn run_build(&self) -> Result<BuildOutput> {
        let descriptor = BuildDescriptor::read(&self.config.module_dir())?;
        let sdk = self.sdk().await?;

        let config = BuildConfig::from_release_config(&self.config).with_verbose(self.verbose);
        let mut runner = BuildRunner::new(config, sdk.clone())
            .with_build_tools_version(descriptor.build_tools_version.clone());

        if self.config.build_type == BuildType::Release {
            runner = runner.with_keystore(KeyStore::from(&self.config.signing()?));
        }

        Ok(runner.build().await?)
    }

    /// Install and launch the build. Returns whether both succeeded;
    /// failures are reported on the bus only.
    pub async fn install(&self, build: &BuildOutput) -> bool {
        self.bus.stage_started(STAGE_INSTALL);
        match self.run_install(build).await {
            Ok(()) => {
                self.bus.stage_completed(STAGE_INSTALL);
                true
            }
            Err(e) => {
                self.bus.stage_failed(STAGE_INSTALL, &format!("{:#}", e));
                false
            }
        }
    }

    async fn run_install(&self, build: &BuildOutput) -> Result<()> {
        let package = self.launch_package()?;
        let adb = AdbClient::new(self.sdk().await?.adb()?);

        let device = adb
            .usable_device(None)
            .await
            .context("Wasn't possible to find a device")?;
        info!("Using device {}", device.display_name());

        adb.install(&build.path, Some(&device.serial))
            .await
            .context("Wasn't possible to install the apk on a device")?;
        self.bus.success("APK installed successfully");

        adb.launch(&package.to_string(), Some(&device.serial))
            .await
            .context("Wasn't possible to start the app on a device")?;
        self.bus.success("Starting app on connected device...");

        Ok(())
    }

    /// The configured package, else the build script's `applicationId`
    pub fn launch_package(&self) -> Result<PackageIdentifier> {
        if let Some(package) = &self.config.application_package_name {
            return Ok(package.clone());
        }
        Ok(BuildDescriptor::read(&self.config.module_dir())?.package()?)
    }

    async fn sdk(&self) -> Result<&SdkInfo> {
        self.sdk
            .get_or_try_init(|| async {
                SdkLocator::new()
                    .with_path(self.config.android_sdk_path.clone())
                    .locate()
                    .await
                    .context("locating the Android SDK")
            })
            .await
    }

    fn report<T>(&self, stage: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.bus.stage_completed(stage),
            Err(e) => self.bus.stage_failed(stage, &format!("{:#}", e)),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use droid_release_build::BuildVariant;
    use droid_release_core::{EventSubscription, ReleaseEvent};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Android project plus a fake SDK with one build-tools version
    fn workspace() -> (TempDir, ReleaseConfig) {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project");
        write(
            &project,
            "app/build.gradle",
            "android {\n    buildToolsVersion '30.0.3'\n    defaultConfig {\n        applicationId 'com.old'\n    }\n}\n",
        );
        write(&project, "app/src/main/AndroidManifest.xml", "<manifest package=\"com.old\"/>\n");
        write(&project, "app/src/main/java/com/old/App.java", "package com.old;\n");

        let sdk = dir.path().join("sdk");
        fs::create_dir_all(sdk.join("build-tools/30.0.3")).unwrap();

        let mut config = ReleaseConfig::new(&project);
        config.output_path = dir.path().join("generated");
        config.android_sdk_path = Some(sdk);
        (dir, config)
    }

    fn make_pipeline(config: ReleaseConfig) -> (ReleasePipeline, EventSubscription) {
        let bus = Arc::new(EventBus::new());
        let events = bus.subscribe();
        (ReleasePipeline::new(config, bus), events)
    }

    fn stage_events(events: &EventSubscription) -> Vec<ReleaseEvent> {
        events
            .drain()
            .into_iter()
            .filter(|e| !matches!(e, ReleaseEvent::Log { .. }))
            .collect()
    }

    #[tokio::test]
    async fn test_release_runs_stages_in_order_until_build_fails() {
        let (dir, mut config) = workspace();
        let icon = dir.path().join("icon.png");
        image::RgbaImage::from_pixel(256, 256, image::Rgba([0, 0, 0, 255]))
            .save(&icon)
            .unwrap();
        config.application_icon_path = Some(icon);
        config.application_package_name = Some("com.fresh".parse().unwrap());
        let project = config.application_path.clone();

        let (pipeline, events) = make_pipeline(config);
        let err = pipeline.run().await.unwrap_err();

        assert!(format!("{:#}", err).contains("Gradle wrapper not found"));
        assert_eq!(
            stage_events(&events),
            vec![
                ReleaseEvent::StageStarted(STAGE_ICONS.into()),
                ReleaseEvent::StageCompleted(STAGE_ICONS.into()),
                ReleaseEvent::StageStarted(STAGE_RENAME.into()),
                ReleaseEvent::StageCompleted(STAGE_RENAME.into()),
                ReleaseEvent::StageStarted(STAGE_BUILD.into()),
                ReleaseEvent::StageFailed {
                    stage: STAGE_BUILD.into(),
                    message: format!("{:#}", err),
                },
            ]
        );

        assert!(project.join("app/src/main/res/mipmap-xxxhdpi/ic_launcher.png").is_file());
        assert_eq!(
            fs::read_to_string(project.join("app/src/main/java/com/fresh/App.java")).unwrap(),
            "package com.fresh;\n"
        );
        assert!(fs::read_to_string(project.join("app/build.gradle"))
            .unwrap()
            .contains("applicationId 'com.fresh'"));
    }

    #[tokio::test]
    async fn test_icon_failure_is_reported() {
        let (dir, config) = workspace();
        let (pipeline, events) = make_pipeline(config);

        let err = pipeline
            .generate_icons(Some(&dir.path().join("missing.png")))
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("generating launcher icons"));
        assert_eq!(
            stage_events(&events),
            vec![
                ReleaseEvent::StageStarted(STAGE_ICONS.into()),
                ReleaseEvent::StageFailed {
                    stage: STAGE_ICONS.into(),
                    message: format!("{:#}", err),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_optional_stages_are_skipped() {
        let (_dir, config) = workspace();
        let (pipeline, events) = make_pipeline(config);

        assert!(pipeline.generate_icons(None).await.unwrap().is_none());
        assert!(pipeline.rename(None, None).await.unwrap().is_none());
        assert!(stage_events(&events).is_empty());
    }

    #[tokio::test]
    async fn test_rename_with_explicit_packages() {
        let (_dir, config) = workspace();
        let project = config.application_path.clone();
        let (pipeline, _events) = make_pipeline(config);

        let outcome = pipeline
            .rename(Some("com.old".parse().unwrap()), Some("org.next.app".parse().unwrap()))
            .await
            .unwrap()
            .unwrap();

        assert!(!outcome.unchanged);
        assert!(project.join("app/src/main/java/org/next/app/App.java").is_file());
        assert!(!project.join("app/src/main/java/com").exists());
        assert_eq!(pipeline.launch_package().unwrap().to_string(), "org.next.app");
    }

    #[tokio::test]
    async fn test_rename_failure_is_reported() {
        let (_dir, config) = workspace();
        let project = config.application_path.clone();
        write(&project, "app/src/main/java/com/fresh/App.java", "// taken\n");
        let (pipeline, events) = make_pipeline(config);

        let err = pipeline
            .rename(None, Some("com.fresh".parse().unwrap()))
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("rename failed during restructure"));
        assert!(stage_events(&events).contains(&ReleaseEvent::StageFailed {
            stage: STAGE_RENAME.into(),
            message: format!("{:#}", err),
        }));
    }

    #[tokio::test]
    async fn test_release_build_requires_signing() {
        let (_dir, mut config) = workspace();
        config.build_type = BuildType::Release;
        let (pipeline, _events) = make_pipeline(config);

        let err = pipeline.build().await.unwrap_err();
        assert!(format!("{:#}", err).contains("signing_keystore_path"));
    }

    #[tokio::test]
    async fn test_install_failure_is_not_fatal() {
        let (dir, config) = workspace();
        let sdk = config.android_sdk_path.clone().unwrap();
        // Present but not executable, so spawning it fails.
        write(&sdk, &format!("platform-tools/{}", droid_release_toolchain::executable_name("adb")), "");
        let apk = dir.path().join("generated/debug.apk");
        write(dir.path(), "generated/debug.apk", "apk");
        let (pipeline, events) = make_pipeline(config);

        let build = BuildOutput {
            path: apk.clone(),
            built: apk,
            duration_secs: 0.0,
            size: 3,
            signed: false,
            variant: BuildVariant::Debug,
            metadata: None,
        };

        assert!(!pipeline.install(&build).await);
        let stages = stage_events(&events);
        assert_eq!(stages[0], ReleaseEvent::StageStarted(STAGE_INSTALL.into()));
        assert!(matches!(
            &stages[1],
            ReleaseEvent::StageFailed { stage, .. } if stage == STAGE_INSTALL
        ));
    }

    #[test]
    fn test_launch_package_falls_back_to_application_id() {
        let (_dir, mut config) = workspace();
        let (pipeline, _events) = make_pipeline(config.clone());
        assert_eq!(pipeline.launch_package().unwrap().to_string(), "com.old");

        config.application_package_name = Some("com.configured".parse().unwrap());
        config.application_path = PathBuf::from("/nonexistent");
        let (pipeline, _events) = make_pipeline(config);
        assert_eq!(pipeline.launch_package().unwrap().to_string(), "com.configured");
    }
}
