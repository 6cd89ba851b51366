//! Lifecycle commands: `check`, `download`, `apply`, `recover`, `clean`.
//!
//! Each command loads the updater configuration named by `--config` and drives one
//! phase of an [`Updater`] session.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{CliConfig, CommandOutcome};
use crate::config::UpdateConfig;
use crate::updater::{RecoveryOutcome, Updater};

fn load_updater(config: &CliConfig) -> Result<Updater> {
    let update_config = UpdateConfig::load(&config.config_path).with_context(|| {
        format!("Failed to load updater configuration {}", config.config_path.display())
    })?;
    Ok(Updater::new(update_config)?.with_progress(config.show_progress))
}

/// Report whether a newer version is published.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Exit with status 2 when an update is available
    #[arg(long)]
    pub exit_code: bool,
}

impl CheckCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<CommandOutcome> {
        let mut updater = load_updater(config)?;
        let current = updater.config().current_version().to_string();

        match updater.check_for_update().await.context("Update check failed")? {
            Some(version) => {
                println!(
                    "{} {} -> {}",
                    "Update available:".green().bold(),
                    current,
                    version.green()
                );
                println!("Run `bundle-updater download` to fetch it");
                if self.exit_code {
                    return Ok(CommandOutcome::UpdateAvailable);
                }
            }
            None => {
                println!("{} ({current})", "You are on the latest version".green());
            }
        }
        Ok(CommandOutcome::Success)
    }
}

/// Download and verify the published update.
#[derive(Args, Debug)]
pub struct DownloadCommand {}

impl DownloadCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let mut updater = load_updater(config)?;

        let Some(version) = updater.check_for_update().await.context("Update check failed")?
        else {
            println!(
                "{} ({})",
                "Nothing to download, you are on the latest version".green(),
                updater.config().current_version()
            );
            return Ok(());
        };

        updater.download_update().await.context("Download failed")?;
        println!(
            "{} {} to {}",
            "Downloaded".green().bold(),
            version,
            updater.zip_path().display()
        );
        Ok(())
    }
}

/// Install the downloaded update once the application exits.
#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// PID of the running application to wait for (defaults to this process)
    #[arg(long, value_name = "PID")]
    pub wait_pid: Option<u32>,
}

impl ApplyCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let mut updater = load_updater(config)?.with_wait_pid(self.wait_pid);

        updater.apply_update().await.context("Failed to apply update")?;
        println!(
            "{} the application will be replaced once it exits",
            "Update staged:".green().bold()
        );
        println!("Progress is logged to {}", updater.log_path().display());
        Ok(())
    }
}

/// Repair a swap interrupted by a crash or power loss.
#[derive(Args, Debug)]
pub struct RecoverCommand {}

impl RecoverCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let updater = load_updater(config)?;

        match updater.recover_interrupted_swap().await.context("Recovery failed")? {
            RecoveryOutcome::NothingToRecover => println!("No interrupted update found"),
            RecoveryOutcome::InProgress {
                pid,
            } => println!("An update is still in progress (pid {pid})"),
            RecoveryOutcome::Restored {
                from,
                to,
            } => println!(
                "{} {} from {}",
                "Restored".green().bold(),
                to.display(),
                from.display()
            ),
            RecoveryOutcome::StaleJournal => println!("Removed a stale swap journal"),
            RecoveryOutcome::Unrecoverable {
                canonical,
                backup,
            } => {
                anyhow::bail!(
                    "Cannot recover: neither {} nor {} exists. Reinstall the application.",
                    canonical.display(),
                    backup.display()
                );
            }
        }
        Ok(())
    }
}

/// Delete the downloaded update archive.
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let updater = load_updater(config)?;

        if updater.clean_download().await? {
            println!("Removed {}", updater.zip_path().display());
        } else {
            println!("No downloaded update to remove");
        }
        Ok(())
    }
}
