//! Command-line interface.
//!
//! Two audiences share one binary:
//!
//! - **Publishers** run `bundle-updater build` to package a bundle and write its
//!   manifest
//! - **Applications** (or their launch scripts) run the lifecycle commands against an
//!   `updater.toml`
//!
//! # Commands
//!
//! | Command | Description |
//! |---|---|
//! | `build` | Compress, optionally notarize, and write `darwin-<arch>.json` |
//! | `check` | Report whether a newer version is published |
//! | `download` | Download and verify the update archive |
//! | `apply` | Extract and start the detached swap procedure |
//! | `recover` | Repair a swap interrupted by a crash or power loss |
//! | `clean` | Delete a downloaded archive |
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging
//! - `--quiet` / `-q` - errors only, no progress bars
//! - `--config` / `-c` - updater configuration file (default `updater.toml`, or
//!   `BUNDLE_UPDATER_CONFIG`)
//! - `--no-progress` - hide progress bars
//!
//! `RUST_LOG` overrides the log level chosen by the flags.
//!
//! # Examples
//!
//! ```bash
//! bundle-updater build --app-path build/MyApp.app --version 1.4.0 --output-dir dist
//! bundle-updater --config ~/Library/MyApp/updater.toml check
//! bundle-updater download && bundle-updater apply --wait-pid 4242
//! ```

mod build;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive (`debug`, `info`, `error`)
    pub log_level: String,
    /// Show progress bars
    pub show_progress: bool,
    /// Updater configuration file
    pub config_path: PathBuf,
}

impl CliConfig {
    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over the level derived from the flags. Calling
    /// this more than once is harmless.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// How a successful command wants the process to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Exit status 0
    Success,
    /// `check --exit-code` found an update: exit status 2
    UpdateAvailable,
}

impl CommandOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::UpdateAvailable => ExitCode::from(2),
        }
    }
}

/// Self-update orchestrator for application bundles.
#[derive(Parser, Debug)]
#[command(
    name = "bundle-updater",
    about = "Publish and apply crash-safe updates for application bundles",
    version,
    long_about = "bundle-updater packages application bundles with a checksum manifest, \
                  and updates installed bundles in place through a detached swap procedure \
                  that never leaves the application half-replaced."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors and hide progress bars
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the updater configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "BUNDLE_UPDATER_CONFIG",
        default_value = "updater.toml"
    )]
    config: PathBuf,

    /// Hide progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Package a bundle and write its update manifest
    Build(build::BuildCommand),
    /// Check whether a newer version is published
    Check(update::CheckCommand),
    /// Download and verify the published update
    Download(update::DownloadCommand),
    /// Install the downloaded update once the application exits
    Apply(update::ApplyCommand),
    /// Repair a swap interrupted by a crash or power loss
    Recover(update::RecoverCommand),
    /// Delete the downloaded update archive
    Clean(update::CleanCommand),
}

impl Cli {
    /// Execute the parsed command with settings derived from the global flags.
    ///
    /// # Errors
    ///
    /// Returns the command's error; `main` renders it with
    /// [`user_friendly_error`](crate::core::user_friendly_error).
    pub async fn execute(self) -> Result<CommandOutcome> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    /// Derive [`CliConfig`] from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            show_progress: !self.quiet && !self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit configuration, without touching logging.
    ///
    /// # Errors
    ///
    /// Returns the command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<CommandOutcome> {
        match self.command {
            Commands::Build(cmd) => cmd.execute().await?,
            Commands::Check(cmd) => return cmd.execute(&config).await,
            Commands::Download(cmd) => cmd.execute(&config).await?,
            Commands::Apply(cmd) => cmd.execute(&config).await?,
            Commands::Recover(cmd) => cmd.execute(&config).await?,
            Commands::Clean(cmd) => cmd.execute(&config).await?,
        }
        Ok(CommandOutcome::Success)
    }
}
