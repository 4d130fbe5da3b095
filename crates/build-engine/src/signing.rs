//! APK Signing
//!
//! Aligns, signs and verifies release APKs with `zipalign` and `apksigner`.

use std::path::{Path, PathBuf};

use droid_release_core::SigningSettings;
use tokio::process::Command;
use tracing::{debug, info};

use crate::BuildError;

/// APK produced by `assembleRelease` without a signing config
pub const UNSIGNED_APK: &str = "app-release-unsigned.apk";
/// Intermediate output of `zipalign`
pub const ALIGNED_APK: &str = "app-unsigned-aligned.apk";
/// Output of `apksigner sign`
pub const SIGNED_APK: &str = "apk-release.apk";

/// Keystore information
#[derive(Debug, Clone)]
pub struct KeyStore {
    /// Path to keystore file
    pub path: PathBuf,
    /// Keystore password
    pub password: String,
    /// Key password
    pub key_password: String,
    /// Key alias, required when the keystore holds more than one key
    pub alias: Option<String>,
}

impl KeyStore {
    pub fn new(path: PathBuf, password: &str, key_password: &str) -> Self {
        Self {
            path,
            password: password.to_string(),
            key_password: key_password.to_string(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Check if keystore exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl From<&SigningSettings> for KeyStore {
    fn from(settings: &SigningSettings) -> Self {
        Self {
            path: settings.keystore_path.clone(),
            password: settings.keystore_password.clone(),
            key_password: settings.key_password.clone(),
            alias: settings.key_alias.clone(),
        }
    }
}

/// APK Signer
pub struct ApkSigner {
    zipalign: PathBuf,
    apksigner: PathBuf,
    verbose: bool,
}

impl ApkSigner {
    /// Create a signer from tool paths, usually taken from one build-tools version
    pub fn new(zipalign: PathBuf, apksigner: PathBuf) -> Self {
        Self {
            zipalign,
            apksigner,
            verbose: false,
        }
    }

    /// Pass `-v` to every tool
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Align, sign and verify the unsigned release APK in `output_dir`,
    /// returning the signed APK
    pub async fn sign_release(&self, output_dir: &Path, keystore: &KeyStore) -> Result<PathBuf, BuildError> {
        let unsigned = output_dir.join(UNSIGNED_APK);
        let aligned = output_dir.join(ALIGNED_APK);
        let signed = output_dir.join(SIGNED_APK);

        if !unsigned.is_file() {
            return Err(BuildError::ApkNotFound(unsigned));
        }
        if !keystore.exists() {
            return Err(BuildError::SigningError(format!(
                "keystore not found: {:?}",
                keystore.path
            )));
        }

        info!("Starting APK signing...");

        remove_stale(&aligned)?;
        self.zipalign(&unsigned, &aligned).await?;
        info!("✓ APK aligned");

        remove_stale(&signed)?;
        self.sign(&aligned, &signed, keystore).await?;
        info!("✓ APK signed");

        self.verify(&signed).await?;
        info!("✓ APK verified successfully");

        Ok(signed)
    }

    /// `zipalign [-v] -p 4 <input> <output>`
    pub fn zipalign_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if self.verbose {
            args.push("-v".to_string());
        }
        args.extend(["-p", "4"].map(String::from));
        args.push(input.to_string_lossy().to_string());
        args.push(output.to_string_lossy().to_string());
        args
    }

    /// `apksigner sign [-v] --ks ... --out <output> <input>`
    pub fn sign_args(&self, input: &Path, output: &Path, keystore: &KeyStore) -> Vec<String> {
        let mut args = vec!["sign".to_string()];
        if self.verbose {
            args.push("-v".to_string());
        }
        args.extend([
            "--ks".to_string(),
            keystore.path.to_string_lossy().to_string(),
            "--ks-pass".to_string(),
            format!("pass:{}", keystore.password),
            "--key-pass".to_string(),
            format!("pass:{}", keystore.key_password),
        ]);
        if let Some(alias) = &keystore.alias {
            args.push("--ks-key-alias".to_string());
            args.push(alias.clone());
        }
        args.push("--out".to_string());
        args.push(output.to_string_lossy().to_string());
        args.push(input.to_string_lossy().to_string());
        args
    }

    /// `apksigner verify [-v] <apk>`
    pub fn verify_args(&self, apk: &Path) -> Vec<String> {
        let mut args = vec!["verify".to_string()];
        if self.verbose {
            args.push("-v".to_string());
        }
        args.push(apk.to_string_lossy().to_string());
        args
    }

    /// Zipalign an APK
    pub async fn zipalign(&self, input: &Path, output: &Path) -> Result<(), BuildError> {
        debug!("Zipaligning APK: {:?}", input);
        let args = self.zipalign_args(input, output);
        run_tool(&self.zipalign, &args)
            .await
            .map_err(|e| BuildError::SigningError(format!("zipalign failed: {}", e)))
    }

    /// Sign an APK
    pub async fn sign(&self, input: &Path, output: &Path, keystore: &KeyStore) -> Result<(), BuildError> {
        debug!("Signing APK: {:?}", input);
        let args = self.sign_args(input, output, keystore);
        run_tool(&self.apksigner, &args)
            .await
            .map_err(|e| BuildError::SigningError(format!("apksigner sign failed: {}", e)))
    }

    /// Verify APK signature
    pub async fn verify(&self, apk: &Path) -> Result<(), BuildError> {
        let args = self.verify_args(apk);
        run_tool(&self.apksigner, &args)
            .await
            .map_err(|e| BuildError::SigningError(format!("apksigner verify failed: {}", e)))
    }
}

/// Run a build-tools executable, returning its stderr (or the spawn error) on failure
async fn run_tool(program: &Path, args: &[String]) -> Result<(), String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("{:?}: {}", program, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!("{}", stdout.trim_end());
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} {}", output.status, stderr.trim()));
    }
    Ok(())
}

fn remove_stale(path: &Path) -> Result<(), BuildError> {
    if path.exists() {
        debug!("Removing stale {:?}", path);
        std::fs::remove_file(path)?;
    }
    Ok(())
}
