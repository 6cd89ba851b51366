//! The swap procedure and its parameters.
//!
//! The procedure is a fixed bash program (`swap_procedure.sh`, embedded at compile
//! time). It is written to the staging directory unchanged on every apply, and all
//! per-update values reach it through its argument vector. Paths containing spaces,
//! quotes or `$` therefore need no escaping.
//!
//! Steps, in order:
//!
//! 1. Poll `kill -0 <pid>` every 0.5 s until the application exits, optionally bounded
//!    by a timeout, then wait one more second for file handles to close
//! 2. Clear the quarantine attribute from the new bundle (failure is ignored)
//! 3. Abort if the new bundle is gone; run the before-update command if any
//! 4. Rename the installed bundle to the backup path, then the new bundle to the
//!    installed path. A failure between the two renames restores the backup
//! 5. Delete the backup, the archive and the swap journal; run the after-update
//!    command; relaunch with `open -n` if enabled
//!
//! Aborts before step 4 leave the installed bundle untouched. Everything after the
//! second rename is best effort; the update counts as committed once the new bundle
//! sits at the installed path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::UpdateError;

/// Source of the swap procedure.
pub const SWAP_SCRIPT: &str = include_str!("swap_procedure.sh");

/// Interpreter the procedure is started with.
pub const SCRIPT_INTERPRETER: &str = "/bin/bash";

/// Everything the swap procedure needs to know about one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParameters {
    /// Process to wait for, normally the application itself
    pub pid: u32,
    /// Bundle extracted from the archive
    pub new_app_path: PathBuf,
    /// Installed bundle to replace
    pub current_app_path: PathBuf,
    /// Where the installed bundle is parked during the swap
    pub backup_path: PathBuf,
    /// Downloaded archive, deleted after the swap
    pub zip_path: PathBuf,
    /// Swap journal, deleted on every normal exit
    pub journal_path: PathBuf,
    /// Bound on waiting for `pid`; `0` waits forever
    pub wait_timeout_secs: u64,
    /// Relaunch the installed bundle after the swap
    pub relaunch: bool,
    /// Shell command run before the swap
    pub before_update_command: Option<String>,
    /// Shell command run after the swap
    pub after_update_command: Option<String>,
}

impl SwapParameters {
    /// Positional arguments for the procedure, in the order it reads them.
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        vec![
            self.pid.to_string().into(),
            self.new_app_path.clone().into_os_string(),
            self.current_app_path.clone().into_os_string(),
            self.backup_path.clone().into_os_string(),
            self.zip_path.clone().into_os_string(),
            self.journal_path.clone().into_os_string(),
            self.wait_timeout_secs.to_string().into(),
            OsString::from(if self.relaunch { "1" } else { "0" }),
            self.before_update_command.clone().unwrap_or_default().into(),
            self.after_update_command.clone().unwrap_or_default().into(),
        ]
    }
}

/// Write the procedure to `path` with mode 0755, replacing any previous copy.
///
/// # Errors
///
/// Returns [`UpdateError::Io`] if the file cannot be written or made executable.
pub async fn write_script(path: &Path) -> Result<(), UpdateError> {
    tokio::fs::write(path, SWAP_SCRIPT).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    }

    Ok(())
}
