//! The update lifecycle: check, download, apply.
//!
//! An [`Updater`] is a session around one [`UpdateConfig`]. It is driven from a
//! single task, in order:
//!
//! 1. [`check_for_update`](Updater::check_for_update) fetches the manifest for this
//!    architecture and caches it on the session
//! 2. [`download_update`](Updater::download_update) streams the archive into the
//!    staging directory and verifies its SHA-256 against the manifest
//! 3. [`apply_update`](Updater::apply_update) extracts the archive, locates the new
//!    bundle and hands the swap to a detached procedure
//!
//! After `apply_update` returns `Ok(())` the caller must exit promptly: the swap
//! procedure waits for this process to terminate before replacing the bundle.
//!
//! On the next launch, [`recover_interrupted_swap`](Updater::recover_interrupted_swap)
//! repairs a swap that was cut short by power loss or a killed procedure.
//!
//! # Staging Layout
//!
//! ```text
//! <download_path>/
//! ├── <zip_file_name>        downloaded archive
//! ├── extracted/             archive contents, recreated on every apply
//! ├── update-script          swap procedure (0755)
//! ├── update.log             procedure output
//! ├── swap-journal.json      present while a swap is pending
//! └── backup-<unix>.app      installed bundle during the swap
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundle_updater::config::UpdateConfig;
//! use bundle_updater::updater::Updater;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), bundle_updater::core::UpdateError> {
//! let config = UpdateConfig::load(Path::new("updater.toml"))?;
//! let mut updater = Updater::new(config)?;
//!
//! updater.recover_interrupted_swap().await?;
//!
//! if let Some(version) = updater.check_for_update().await? {
//!     println!("Updating to {version}");
//!     updater.download_update().await?;
//!     updater.apply_update().await?;
//!     std::process::exit(0);
//! }
//! # Ok(())
//! # }
//! ```

mod applier;
mod checker;
mod downloader;
pub mod recovery;
pub mod script;

pub use recovery::{RecoveryOutcome, SwapJournal};
pub use script::SwapParameters;

use std::path::PathBuf;
use std::time::Duration;

use crate::config::UpdateConfig;
use crate::core::UpdateError;
use crate::manifest::Manifest;
use crate::utils::platform::manifest_file_name;

/// Directory inside the staging directory the archive is extracted into.
pub const EXTRACTED_DIR_NAME: &str = "extracted";
/// File name of the rendered swap procedure.
pub const SCRIPT_FILE_NAME: &str = "update-script";
/// File name of the swap procedure's log.
pub const LOG_FILE_NAME: &str = "update.log";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Progress of [`Updater::apply_update`].
///
/// The state only moves forward. A failure leaves the session in the state that
/// failed, and a new apply starts over from [`ApplyState::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    /// Nothing applied yet, or preconditions being checked
    Idle,
    /// Unpacking the archive
    Extracting,
    /// Looking for the bundle in the extracted tree
    Locating,
    /// Procedure and journal written
    ScriptGenerated,
    /// Procedure running on its own; the caller should exit
    Detached,
}

/// An update session for one installed application.
#[derive(Debug)]
pub struct Updater {
    config: UpdateConfig,
    client: reqwest::Client,
    manifest: Option<Manifest>,
    state: ApplyState,
    show_progress: bool,
    wait_pid: Option<u32>,
}

impl Updater {
    /// Create a session with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] if the HTTP client cannot be initialized
    /// (for example when no TLS backend is available).
    pub fn new(config: UpdateConfig) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("bundle-updater/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| UpdateError::ConfigError {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self::with_client(config, client))
    }

    /// Create a session around an existing HTTP client.
    #[must_use]
    pub fn with_client(config: UpdateConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            manifest: None,
            state: ApplyState::Idle,
            show_progress: false,
            wait_pid: None,
        }
    }

    /// Show a terminal progress bar while downloading.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Make the swap procedure wait for `pid` instead of the calling process.
    ///
    /// For a helper process that applies an update on behalf of the running
    /// application, such as the command-line front end.
    #[must_use]
    pub fn with_wait_pid(mut self, pid: Option<u32>) -> Self {
        self.wait_pid = pid;
        self
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Manifest from the last successful check.
    #[must_use]
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Current apply state.
    #[must_use]
    pub fn state(&self) -> ApplyState {
        self.state
    }

    /// URL of the manifest for this architecture.
    #[must_use]
    pub fn manifest_url(&self) -> String {
        format!("{}{}", self.config.source_url(), manifest_file_name())
    }

    /// URL of the update archive.
    #[must_use]
    pub fn archive_url(&self) -> String {
        format!("{}{}", self.config.source_url(), self.config.zip_file_name())
    }

    /// Where the downloaded archive is (or will be) stored.
    #[must_use]
    pub fn zip_path(&self) -> PathBuf {
        self.config.download_path().join(self.config.zip_file_name())
    }

    /// Whether a downloaded archive is present.
    ///
    /// Presence only; the digest is not rechecked.
    #[must_use]
    pub fn is_downloaded(&self) -> bool {
        self.zip_path().is_file()
    }

    /// Delete the downloaded archive. Returns whether there was one.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] if the file exists but cannot be removed.
    pub async fn clean_download(&self) -> Result<bool, UpdateError> {
        let path = self.zip_path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Removed downloaded update {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Repair a swap that was interrupted before it could finish or roll back.
    ///
    /// Safe to call on every launch; returns
    /// [`RecoveryOutcome::NothingToRecover`] when there is no pending swap.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] if the journal or the backup cannot be handled.
    pub async fn recover_interrupted_swap(&self) -> Result<RecoveryOutcome, UpdateError> {
        recovery::recover(&self.journal_path()).await
    }

    /// Directory the archive is extracted into.
    #[must_use]
    pub fn extracted_dir(&self) -> PathBuf {
        self.config.download_path().join(EXTRACTED_DIR_NAME)
    }

    /// Path of the rendered swap procedure.
    #[must_use]
    pub fn script_path(&self) -> PathBuf {
        self.config.download_path().join(SCRIPT_FILE_NAME)
    }

    /// Log of the swap procedure, for diagnosing a failed swap after restart.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.config.download_path().join(LOG_FILE_NAME)
    }

    /// Swap journal path.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.config.download_path().join(recovery::JOURNAL_FILE_NAME)
    }
}
