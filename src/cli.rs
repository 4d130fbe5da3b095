//! Command line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use droid_release_core::config::DEFAULT_CONFIG_FILE;
use droid_release_core::PackageIdentifier;

/// droid-release: build, sign and install an Android application from a configuration file
#[derive(Parser, Debug)]
#[command(name = "droid-release", version)]
#[command(about = "Release automation for Android Gradle projects", long_about = None)]
pub struct Cli {
    /// Configuration file (JSON, or TOML when it ends in .toml)
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Debug logging and verbose zipalign/apksigner output
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to run; `release` when omitted
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Icons, package rename, build, publish and install
    Release,
    /// Rename the application package only
    Rename {
        /// New package; defaults to application_package_name
        #[arg(long)]
        to: Option<PackageIdentifier>,
        /// Current package; defaults to the applicationId in build.gradle
        #[arg(long)]
        from: Option<PackageIdentifier>,
    },
    /// Generate launcher icons only
    Icons {
        /// Source image; defaults to application_icon_path
        #[arg(long)]
        icon: Option<PathBuf>,
    },
    /// Build and publish the APK without installing it
    Build,
}

impl Cli {
    /// Parse CLI arguments from the environment
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// The subcommand to run
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["droid-release"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("configuration.json"));
        assert!(!cli.verbose);
        assert_eq!(cli.command(), Command::Release);
    }

    #[test]
    fn test_rename_arguments() {
        let cli = Cli::try_parse_from([
            "droid-release",
            "rename",
            "--to",
            "com.example.next",
            "--from",
            "com.example.demo",
        ])
        .unwrap();

        match cli.command() {
            Command::Rename { to, from } => {
                assert_eq!(to.unwrap().to_string(), "com.example.next");
                assert_eq!(from.unwrap().to_string(), "com.example.demo");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_package_is_rejected() {
        assert!(Cli::try_parse_from(["droid-release", "rename", "--to", "com..broken"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["droid-release", "build", "--verbose", "--config", "release.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("release.toml"));
        assert_eq!(cli.command(), Command::Build);
    }

    #[test]
    fn test_icons_override() {
        let cli = Cli::try_parse_from(["droid-release", "icons", "--icon", "art/icon.png"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::Icons {
                icon: Some(PathBuf::from("art/icon.png"))
            }
        );
    }
}
