//! Detached process launch and PID liveness checks.
//!
//! The swap procedure must survive the exit of the process that started it, so it is
//! launched as the leader of a new session (`setsid`) with its output redirected to a
//! log file and stdin closed. The child handle is dropped without waiting; the
//! standard library never kills a child on drop.
//!
//! A dropped child that finishes while the caller is still running stays a zombie
//! until reaped. [`is_process_alive`] reaps such a child, so it reports the finished
//! procedure as gone instead of alive.

use std::ffi::OsString;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use crate::core::UpdateError;

/// Start `interpreter script args...` detached from the calling process.
///
/// Both stdout and stderr are appended to `log_path`. Returns the PID of the
/// detached process.
///
/// # Errors
///
/// - [`UpdateError::LaunchError`] if the log file cannot be opened or the process
///   cannot be spawned. Nothing is running in that case.
/// - [`UpdateError::HandoffError`] if the process started but inspecting its handle
///   failed. The process may still be running.
pub fn spawn_detached(
    interpreter: &Path,
    script: &Path,
    args: &[OsString],
    log_path: &Path,
) -> Result<u32, UpdateError> {
    let launch_error = |reason: String| UpdateError::LaunchError {
        script: script.to_path_buf(),
        reason,
    };

    let log = File::options()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| launch_error(format!("cannot open log {}: {e}", log_path.display())))?;
    let log_err = log.try_clone().map_err(|e| launch_error(format!("cannot share log: {e}")))?;

    let mut command = Command::new(interpreter);
    command.arg(script).args(args).stdin(Stdio::null()).stdout(log).stderr(log_err);
    if let Some(dir) = script.parent() {
        command.current_dir(dir);
    }
    new_session(&mut command);

    let mut child = command.spawn().map_err(|e| launch_error(e.to_string()))?;
    let pid = child.id();

    match child.try_wait() {
        Ok(Some(status)) => {
            warn!("Swap procedure (pid {pid}) exited immediately with {status}");
        }
        Ok(None) => debug!("Swap procedure running detached as pid {pid}"),
        Err(e) => {
            return Err(UpdateError::HandoffError {
                pid,
                reason: e.to_string(),
            });
        }
    }

    drop(child);
    Ok(pid)
}

#[cfg(unix)]
fn new_session(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: setsid is async-signal-safe and touches no state of the parent.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid().map(|_| ()).map_err(std::io::Error::from)
        });
    }
}

#[cfg(not(unix))]
fn new_session(_command: &mut Command) {}

/// Whether a process with this PID currently exists.
///
/// A process owned by another user still counts as alive. A child of the calling
/// process that has exited is reaped and reported as not alive.
#[cfg(unix)]
#[must_use]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal;
    use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
    use nix::unistd::Pid;

    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return false,
    };
    let pid = Pid::from_raw(raw);

    // ECHILD: not our child, fall through to the signal probe.
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::StillAlive) => return true,
        Ok(_) => return false,
        Err(_) => {}
    }

    match signal::kill(pid, None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_process_alive(_pid: u32) -> bool {
    false
}
