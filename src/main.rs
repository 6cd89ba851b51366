//! bundle-updater - publish and apply application bundle updates
//!
//! Command-line entry point. See the [`bundle_updater::cli`] module for the
//! available commands.

use bundle_updater::cli;
use bundle_updater::core::user_friendly_error;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    match cli.execute().await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            ExitCode::FAILURE
        }
    }
}
