//! ADB (Android Debug Bridge) Client
//!
//! Installs and launches APKs via ADB.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::device::Device;
use crate::LAUNCHER_CATEGORY;

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error("ADB not found at {0}")]
    NotFound(PathBuf),
    #[error("No usable device connected")]
    NoDevice,
    #[error("ADB command failed: {0}")]
    CommandFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// ADB Client
#[derive(Debug, Clone)]
pub struct AdbClient {
    adb: PathBuf,
}

impl AdbClient {
    /// Create a client for an `adb` executable
    pub fn new(adb: PathBuf) -> Self {
        Self { adb }
    }

    /// Get the ADB executable path
    pub fn adb_path(&self) -> &Path {
        &self.adb
    }

    /// Check if ADB is available
    pub fn is_available(&self) -> bool {
        self.adb.is_file()
    }

    /// Run an ADB command, returning stdout
    async fn run(&self, args: &[String]) -> Result<String, AdbError> {
        if !self.is_available() {
            return Err(AdbError::NotFound(self.adb.clone()));
        }

        debug!("adb {:?}", args);

        let output = Command::new(&self.adb).args(args).output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdbError::CommandFailed(format!("{} {}", stderr.trim(), stdout.trim())));
        }

        Ok(stdout)
    }

    /// List connected devices
    pub async fn list_devices(&self) -> Result<Vec<Device>, AdbError> {
        let output = self.run(&["devices".to_string(), "-l".to_string()]).await?;
        Ok(parse_devices(&output))
    }

    /// First online device, or the one matching `serial`
    pub async fn usable_device(&self, serial: Option<&str>) -> Result<Device, AdbError> {
        self.list_devices()
            .await?
            .into_iter()
            .filter(Device::is_usable)
            .find(|d| serial.map(|s| d.serial == s).unwrap_or(true))
            .ok_or(AdbError::NoDevice)
    }

    /// `[-s <serial>] install -r <apk>`
    pub fn install_args(apk: &Path, serial: Option<&str>) -> Vec<String> {
        let mut args = serial_args(serial);
        args.extend(["install".to_string(), "-r".to_string()]);
        args.push(apk.to_string_lossy().to_string());
        args
    }

    /// `[-s <serial>] shell monkey -p <package> -c <launcher> 1`
    pub fn launch_args(package: &str, serial: Option<&str>) -> Vec<String> {
        let mut args = serial_args(serial);
        args.extend(
            ["shell", "monkey", "-p", package, "-c", LAUNCHER_CATEGORY, "1"].map(String::from),
        );
        args
    }

    /// Install (or replace) an APK
    pub async fn install(&self, apk: &Path, serial: Option<&str>) -> Result<(), AdbError> {
        info!("Installing {:?}...", apk);
        let output = self.run(&Self::install_args(apk, serial)).await?;

        // Older adb versions exit 0 on "Failure [INSTALL_FAILED_...]"
        if let Some(line) = output.lines().find(|l| l.starts_with("Failure")) {
            return Err(AdbError::CommandFailed(line.trim().to_string()));
        }
        Ok(())
    }

    /// Start the package's launcher activity
    pub async fn launch(&self, package: &str, serial: Option<&str>) -> Result<(), AdbError> {
        info!("Starting {} on connected device...", package);
        let output = self.run(&Self::launch_args(package, serial)).await?;

        if output.contains("monkey aborted") || output.contains("No activities found") {
            return Err(AdbError::CommandFailed(output.trim().to_string()));
        }
        Ok(())
    }
}

fn serial_args(serial: Option<&str>) -> Vec<String> {
    match serial {
        Some(serial) => vec!["-s".to_string(), serial.to_string()],
        None => Vec::new(),
    }
}

/// Parse `adb devices -l` output
pub fn parse_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(Device::parse_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceState;

    #[test]
    fn test_parse_devices_output() {
        let output = "* daemon not running; starting now at tcp:5037\n\
                      * daemon started successfully\n\
                      List of devices attached\n\
                      emulator-5554          device product:sdk_gphone64 model:Pixel_7 transport_id:2\n\
                      0123456789ABCDEF       offline transport_id:1\n\n";

        let devices = parse_devices(output);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert_eq!(devices[1].state, DeviceState::Offline);
    }

    #[test]
    fn test_install_args() {
        let args = AdbClient::install_args(Path::new("generated/app-release.apk"), None);
        assert_eq!(args, vec!["install", "-r", "generated/app-release.apk"]);

        let args = AdbClient::install_args(Path::new("debug.apk"), Some("emulator-5554"));
        assert_eq!(args, vec!["-s", "emulator-5554", "install", "-r", "debug.apk"]);
    }

    #[test]
    fn test_launch_args() {
        let args = AdbClient::launch_args("com.example.demo", None);
        assert_eq!(
            args,
            vec![
                "shell",
                "monkey",
                "-p",
                "com.example.demo",
                "-c",
                "android.intent.category.LAUNCHER",
                "1"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_adb() {
        let dir = tempfile::tempdir().unwrap();
        let client = AdbClient::new(dir.path().join("adb"));

        assert!(!client.is_available());
        assert!(matches!(client.list_devices().await, Err(AdbError::NotFound(_))));
        assert!(matches!(
            client.install(Path::new("a.apk"), None).await,
            Err(AdbError::NotFound(_))
        ));
    }
}
