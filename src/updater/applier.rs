//! Applying a downloaded update: extract, locate, hand off.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::recovery::{RecoveryOutcome, SwapJournal, recover};
use super::script::{SCRIPT_INTERPRETER, SwapParameters, write_script};
use super::{ApplyState, Updater};
use crate::core::UpdateError;
use crate::utils::archive::extract_archive;
use crate::utils::process::spawn_detached;

impl Updater {
    /// Prepare the swap and start the detached swap procedure.
    ///
    /// A swap left behind by an earlier apply is settled first: a procedure that is
    /// still running makes this call fail, and an interrupted one is repaired as by
    /// [`recover_interrupted_swap`](Updater::recover_interrupted_swap).
    ///
    /// The preconditions are checked before anything is touched. The archive is
    /// then extracted into a fresh `extracted/` directory, the first `*.app`
    /// directory in it (by name) becomes the new bundle, and the procedure and swap
    /// journal are written. Finally the procedure is started in its own session with
    /// its output going to `update.log`.
    ///
    /// The installed bundle is never modified by this method. On `Ok(())` the caller
    /// must exit promptly so the procedure can proceed.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::SwapInProgress`] if an earlier swap procedure is still running
    /// - [`UpdateError::StagingDirMissing`], [`UpdateError::ArchiveMissing`] or
    ///   [`UpdateError::InstalledBundleMissing`] when a precondition fails
    /// - [`UpdateError::Extraction`] if the archive cannot be unpacked
    /// - [`UpdateError::BundleNotFound`] if it contains no `.app` directory
    /// - [`UpdateError::Io`] if the procedure or journal cannot be written
    /// - [`UpdateError::LaunchError`] if the procedure cannot be started
    /// - [`UpdateError::HandoffError`] if it started but its handle could not be
    ///   inspected; the swap may still happen
    pub async fn apply_update(&mut self) -> Result<(), UpdateError> {
        self.state = ApplyState::Idle;

        let staging = self.config.download_path().to_path_buf();
        let zip_path = self.zip_path();
        let app_path = self.config.app_path().to_path_buf();

        match recover(&self.journal_path()).await? {
            RecoveryOutcome::InProgress {
                pid,
            } => {
                return Err(UpdateError::SwapInProgress {
                    pid,
                });
            }
            RecoveryOutcome::NothingToRecover => {}
            outcome => debug!("Settled earlier swap before applying: {outcome:?}"),
        }

        if !staging.is_dir() {
            return Err(UpdateError::StagingDirMissing {
                path: staging,
            });
        }
        if !zip_path.is_file() {
            return Err(UpdateError::ArchiveMissing {
                path: zip_path,
            });
        }
        if !app_path.exists() {
            return Err(UpdateError::InstalledBundleMissing {
                path: app_path,
            });
        }

        self.state = ApplyState::Extracting;
        let extracted = self.extracted_dir();
        let extraction_error = |reason: String| UpdateError::Extraction {
            archive: zip_path.clone(),
            reason,
        };
        if tokio::fs::symlink_metadata(&extracted).await.is_ok() {
            tokio::fs::remove_dir_all(&extracted).await.map_err(|e| {
                extraction_error(format!("cannot clear {}: {e}", extracted.display()))
            })?;
        }
        extract_archive(&zip_path, &extracted)
            .await
            .map_err(|e| extraction_error(format!("{e:#}")))?;

        self.state = ApplyState::Locating;
        let new_app = find_app_bundle(&extracted).await?;
        debug!("New bundle located at {}", new_app.display());

        let backup_path = staging.join(format!("backup-{}.app", Utc::now().timestamp()));
        let params = SwapParameters {
            pid: self.wait_pid.unwrap_or_else(std::process::id),
            new_app_path: new_app.clone(),
            current_app_path: app_path.clone(),
            backup_path: backup_path.clone(),
            zip_path,
            journal_path: self.journal_path(),
            wait_timeout_secs: self.config.wait_timeout_secs(),
            relaunch: self.config.start_automatically(),
            before_update_command: self.config.before_update_command().map(str::to_string),
            after_update_command: self.config.after_update_command().map(str::to_string),
        };

        let script_path = self.script_path();
        write_script(&script_path).await?;
        let mut journal = SwapJournal::new(app_path, backup_path, new_app);
        journal.save(&params.journal_path).await?;
        self.state = ApplyState::ScriptGenerated;

        let pid = match spawn_detached(
            Path::new(SCRIPT_INTERPRETER),
            &script_path,
            &params.to_args(),
            &self.log_path(),
        ) {
            Ok(pid) => pid,
            Err(e @ UpdateError::LaunchError { .. }) => {
                if let Err(remove) = tokio::fs::remove_file(&params.journal_path).await {
                    warn!("Could not remove swap journal after failed launch: {remove}");
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        journal.procedure_pid = Some(pid);
        if let Err(e) = journal.save(&params.journal_path).await {
            warn!("Could not record swap procedure pid in journal: {e}");
        }

        self.state = ApplyState::Detached;
        info!(
            "Swap procedure started (pid {pid}); waiting for process {} to exit. Log: {}",
            params.pid,
            self.log_path().display()
        );
        Ok(())
    }
}

/// First immediate subdirectory of `dir` whose name ends in `.app`, by name order.
async fn find_app_bundle(dir: &Path) -> Result<PathBuf, UpdateError> {
    let not_found = || UpdateError::BundleNotFound {
        path: dir.to_path_buf(),
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(|_| not_found())?;
    let mut bundles = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        let path = entry.path();
        if is_dir && path.extension().is_some_and(|ext| ext == "app") {
            bundles.push(path);
        }
    }

    bundles.sort();
    bundles.into_iter().next().ok_or_else(not_found)
}
