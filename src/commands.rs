//! CLI commands for droid-release
//!
//! Each subcommand drives one or more stages of the `ReleasePipeline`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use droid_release_core::{EventBus, PackageIdentifier, ReleaseConfig};

use crate::cli::{Cli, Command};
use crate::pipeline::ReleasePipeline;

/// Full release command
pub struct ReleaseCommand;

impl ReleaseCommand {
    pub async fn execute(&self, pipeline: &ReleasePipeline) -> Result<()> {
        let summary = pipeline.run().await?;
        summary.log();
        Ok(())
    }
}

/// Package rename command
pub struct RenameCommand {
    pub from: Option<PackageIdentifier>,
    pub to: Option<PackageIdentifier>,
}

impl RenameCommand {
    pub async fn execute(&self, pipeline: &ReleasePipeline) -> Result<()> {
        let Some(outcome) = pipeline.rename(self.from.clone(), self.to.clone()).await? else {
            bail!("No target package: pass --to or set application_package_name");
        };

        if outcome.unchanged {
            info!("Package name already up to date");
        } else {
            info!(
                "Package renamed: {} files rewritten, {} entries moved",
                outcome.rewrite.rewritten.len(),
                outcome.restructure.moved.len()
            );
        }
        Ok(())
    }
}

/// Launcher icons command
pub struct IconsCommand {
    pub icon: Option<PathBuf>,
}

impl IconsCommand {
    pub async fn execute(&self, pipeline: &ReleasePipeline) -> Result<()> {
        let Some(icons) = pipeline.generate_icons(self.icon.as_deref()).await? else {
            bail!("No icon: pass --icon or set application_icon_path");
        };

        for icon in &icons {
            debug!("{}: {:?}", icon.density, icon.path);
        }
        info!("Generated {} launcher icons", icons.len());
        Ok(())
    }
}

/// Build command
pub struct BuildCommand;

impl BuildCommand {
    pub async fn execute(&self, pipeline: &ReleasePipeline) -> Result<()> {
        let output = pipeline.build().await?;
        info!("Build successful: {:?} ({} bytes)", output.path, output.size);
        Ok(())
    }
}

/// Load the configuration named on the command line and run the chosen command
pub async fn execute(cli: &Cli) -> Result<()> {
    let config = ReleaseConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    debug!("Configuration: {:?}", config.redacted());

    let bus = Arc::new(EventBus::new().with_tracing());
    let pipeline = ReleasePipeline::new(config, bus).with_verbose(cli.verbose);

    match cli.command() {
        Command::Release => ReleaseCommand.execute(&pipeline).await,
        Command::Rename { to, from } => RenameCommand { from, to }.execute(&pipeline).await,
        Command::Icons { icon } => IconsCommand { icon }.execute(&pipeline).await,
        Command::Build => BuildCommand.execute(&pipeline).await,
    }
}
