//! bundle-updater - crash-safe self-update for desktop application bundles
//!
//! An application embeds this crate (or shells out to the `bundle-updater` binary) to
//! keep itself current. The lifecycle has three phases:
//!
//! 1. **Check** - fetch `darwin-<arch>.json` from the artifact store and compare its
//!    version with the installed one
//! 2. **Download** - stream the archive into a staging directory and verify its
//!    SHA-256 against the manifest; a mismatching file is deleted
//! 3. **Apply** - extract the archive, locate the new `.app` bundle and start a
//!    detached swap procedure, then exit
//!
//! The swap procedure outlives the application. It waits for the application's PID
//! to disappear, then replaces the bundle with two renames, restoring the original if
//! the second rename fails, and relaunches the new version. A swap journal makes the
//! window between the renames recoverable after power loss.
//!
//! # Publishing
//!
//! [`builder`] packages a bundle into the archive and manifest pair the updater
//! consumes, with optional notarization.
//!
//! # Modules
//!
//! - [`updater`] - the [`Updater`](updater::Updater) session and the swap procedure
//! - [`config`] - [`UpdateConfig`](config::UpdateConfig) loading and validation
//! - [`manifest`] - the published manifest format
//! - [`version`] - semantic version comparison
//! - [`builder`] - packaging and manifest generation
//! - [`core`] - error types and user-facing error rendering
//! - [`utils`] - archives, checksums, platform helpers, processes, progress bars
//! - [`cli`] - the command-line front end
//!
//! # Example
//!
//! ```rust,no_run
//! use bundle_updater::config::UpdateConfig;
//! use bundle_updater::updater::Updater;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), bundle_updater::core::UpdateError> {
//! let mut updater = Updater::new(UpdateConfig::load(Path::new("updater.toml"))?)?;
//! if updater.check_for_update().await?.is_some() {
//!     updater.download_update().await?;
//!     updater.apply_update().await?;
//!     std::process::exit(0);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cli;
pub mod config;
pub mod core;
pub mod manifest;
pub mod updater;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
