//! Launcher Icons
//!
//! Scales one source image into the `mipmap-<density>/ic_launcher.png`
//! files of an Android resource directory.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat};
use tracing::{debug, info};

/// Icon generation errors
#[derive(Debug, thiserror::Error)]
pub enum IconError {
    #[error("Failed to open icon {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("Failed to save icon {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A screen density bucket and its launcher icon edge length in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Density {
    pub name: &'static str,
    pub size: u32,
}

/// Launcher icon densities, largest first
pub const DENSITIES: &[Density] = &[
    Density { name: "xxxhdpi", size: 192 },
    Density { name: "xxhdpi", size: 144 },
    Density { name: "xhdpi", size: 96 },
    Density { name: "hdpi", size: 72 },
    Density { name: "mdpi", size: 48 },
];

/// Default launcher icon resource name
pub const ICON_FILE_NAME: &str = "ic_launcher.png";

/// One written icon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedIcon {
    pub density: &'static str,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// `<module>/src/main/res`
pub fn res_dir(module_dir: &Path) -> PathBuf {
    module_dir.join("src").join("main").join("res")
}

/// Launcher icon generator
#[derive(Debug, Clone)]
pub struct LauncherIcons {
    densities: Vec<Density>,
    file_name: String,
}

impl Default for LauncherIcons {
    fn default() -> Self {
        Self {
            densities: DENSITIES.to_vec(),
            file_name: ICON_FILE_NAME.to_string(),
        }
    }
}

impl LauncherIcons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write icons under another resource name (e.g. `ic_launcher_round.png`)
    pub fn with_file_name(mut self, name: &str) -> Self {
        self.file_name = name.to_string();
        self
    }

    /// Generate every density from `icon` into `res_dir`
    pub fn generate(&self, icon: &Path, res_dir: &Path) -> Result<Vec<GeneratedIcon>, IconError> {
        info!("Generating launcher icons from {:?}...", icon);

        let source = image::open(icon).map_err(|source| IconError::Open {
            path: icon.to_path_buf(),
            source,
        })?;
        debug!("Source icon is {}x{}", source.width(), source.height());

        let mut generated = Vec::with_capacity(self.densities.len());
        for density in &self.densities {
            let dir = res_dir.join(format!("mipmap-{}", density.name));
            fs::create_dir_all(&dir).map_err(|source| IconError::Io {
                path: dir.clone(),
                source,
            })?;

            let scaled = thumbnail(&source, density.size);
            let path = dir.join(&self.file_name);
            scaled
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|source| IconError::Save {
                    path: path.clone(),
                    source,
                })?;

            let (width, height) = scaled.dimensions();
            debug!("[{}] {}x{} -> {:?}", density.name, width, height, path);
            generated.push(GeneratedIcon {
                density: density.name,
                path,
                width,
                height,
            });
        }

        info!("✓ All resolutions generated successfully");
        Ok(generated)
    }
}

/// Fit inside a `size` square keeping the aspect ratio; never enlarges
fn thumbnail(source: &DynamicImage, size: u32) -> DynamicImage {
    let (width, height) = source.dimensions();
    if width <= size && height <= size {
        return source.clone();
    }
    source.resize(size, size, FilterType::Lanczos3)
}
