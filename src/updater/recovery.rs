//! Swap journal and next-launch recovery.
//!
//! Between the two renames of the swap procedure the installed bundle exists only at
//! its backup path. If the machine loses power or the procedure is killed in that
//! window, the rollback trap never runs. To make that state detectable the applier
//! writes a journal (`swap-journal.json`) before starting the procedure, and the
//! procedure deletes it on every exit path it controls. A journal that survives
//! therefore marks an interrupted swap.
//!
//! [`recover`] inspects the journal and repairs what it can:
//!
//! | Installed path | Backup | Outcome |
//! |---|---|---|
//! | present | any | [`RecoveryOutcome::StaleJournal`], leftovers removed |
//! | missing | present | [`RecoveryOutcome::Restored`], backup renamed back |
//! | missing | missing | [`RecoveryOutcome::Unrecoverable`], journal kept |
//!
//! A journal whose procedure is still running is left alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::core::UpdateError;
use crate::utils::process::is_process_alive;

/// File name of the swap journal inside the staging directory.
pub const JOURNAL_FILE_NAME: &str = "swap-journal.json";

/// Record of a swap that has been handed to the swap procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapJournal {
    /// Installed bundle path
    pub canonical: PathBuf,
    /// Backup path the installed bundle is renamed to
    pub backup: PathBuf,
    /// Extracted bundle that replaces it
    pub new_bundle: PathBuf,
    /// PID of the swap procedure, once started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure_pid: Option<u32>,
    /// When the swap was prepared
    pub created_at: DateTime<Utc>,
}

impl SwapJournal {
    /// Create a journal for a swap that has not been started yet.
    #[must_use]
    pub fn new(canonical: PathBuf, backup: PathBuf, new_bundle: PathBuf) -> Self {
        Self {
            canonical,
            backup,
            new_bundle,
            procedure_pid: None,
            created_at: Utc::now(),
        }
    }

    /// Write the journal to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), UpdateError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| UpdateError::Other {
            message: format!("Failed to serialize swap journal: {e}"),
        })?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Read the journal at `path`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] for read failures other than a missing file, and
    /// [`UpdateError::Other`] for a journal that is not valid JSON.
    pub async fn load(path: &Path) -> Result<Option<Self>, UpdateError> {
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&content).map(Some).map_err(|e| UpdateError::Other {
            message: format!("Corrupt swap journal {}: {e}", path.display()),
        })
    }
}

/// Result of [`recover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No journal; the last swap (if any) finished normally
    NothingToRecover,
    /// The swap procedure that owns the journal is still running
    InProgress {
        /// PID of the running procedure
        pid: u32,
    },
    /// The installed bundle was missing and has been restored from the backup
    Restored {
        /// Backup that was renamed
        from: PathBuf,
        /// Installed path it was renamed to
        to: PathBuf,
    },
    /// The installed bundle is in place; the journal was left over and removed
    StaleJournal,
    /// Neither the installed bundle nor the backup exists; the journal is kept
    Unrecoverable {
        /// Installed path that is missing
        canonical: PathBuf,
        /// Backup path that is missing
        backup: PathBuf,
    },
}

/// Inspect the journal at `journal_path` and repair an interrupted swap.
///
/// # Errors
///
/// Returns [`UpdateError::Io`] when the journal cannot be read or removed, or when
/// restoring the backup fails.
pub async fn recover(journal_path: &Path) -> Result<RecoveryOutcome, UpdateError> {
    let journal = match SwapJournal::load(journal_path).await {
        Ok(Some(journal)) => journal,
        Ok(None) => {
            debug!("No swap journal at {}", journal_path.display());
            return Ok(RecoveryOutcome::NothingToRecover);
        }
        Err(UpdateError::Other {
            message,
        }) => {
            warn!("{message}; discarding it");
            remove_journal(journal_path).await?;
            return Ok(RecoveryOutcome::StaleJournal);
        }
        Err(e) => return Err(e),
    };

    if let Some(pid) = journal.procedure_pid
        && is_process_alive(pid)
    {
        info!("Swap procedure {pid} is still running; not touching {}", journal.canonical.display());
        return Ok(RecoveryOutcome::InProgress {
            pid,
        });
    }

    if exists(&journal.canonical).await {
        if exists(&journal.backup).await {
            info!("Removing leftover backup {}", journal.backup.display());
            if let Err(e) = tokio::fs::remove_dir_all(&journal.backup).await {
                warn!("Could not remove leftover backup {}: {e}", journal.backup.display());
            }
        }
        remove_journal(journal_path).await?;
        return Ok(RecoveryOutcome::StaleJournal);
    }

    if exists(&journal.backup).await {
        warn!(
            "Installed bundle {} is missing; restoring {}",
            journal.canonical.display(),
            journal.backup.display()
        );
        tokio::fs::rename(&journal.backup, &journal.canonical).await?;
        remove_journal(journal_path).await?;
        return Ok(RecoveryOutcome::Restored {
            from: journal.backup,
            to: journal.canonical,
        });
    }

    error!(
        "Interrupted swap cannot be repaired: neither {} nor {} exists",
        journal.canonical.display(),
        journal.backup.display()
    );
    Ok(RecoveryOutcome::Unrecoverable {
        canonical: journal.canonical,
        backup: journal.backup,
    })
}

async fn exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

async fn remove_journal(path: &Path) -> Result<(), UpdateError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
