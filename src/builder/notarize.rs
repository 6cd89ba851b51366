//! Submission of archives to Apple's notary service.

use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::core::UpdateError;
use crate::utils::platform::command_exists;

const NOTARY_TOOL: &str = "xcrun";

/// Submit `archive` with `xcrun notarytool` and wait for the verdict.
///
/// Credentials come from a keychain profile created beforehand with
/// `xcrun notarytool store-credentials`.
///
/// # Errors
///
/// Returns [`UpdateError::NotarizationFailed`] if `xcrun` is not installed, exits
/// with a failure status, or reports that the submission was not accepted.
pub async fn notarize(archive: &Path, keychain_profile: &str) -> Result<(), UpdateError> {
    let failed = |reason: String| UpdateError::NotarizationFailed {
        path: archive.to_path_buf(),
        reason,
    };

    if !command_exists(NOTARY_TOOL) {
        return Err(failed(format!("{NOTARY_TOOL} not found; install the Xcode command line tools")));
    }

    info!("Submitting {} for notarization", archive.display());
    let output = Command::new(NOTARY_TOOL)
        .arg("notarytool")
        .arg("submit")
        .arg(archive)
        .arg("--keychain-profile")
        .arg(keychain_profile)
        .arg("--wait")
        .output()
        .await
        .map_err(|e| failed(format!("cannot run {NOTARY_TOOL}: {e}")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!("notarytool output:\n{stdout}{stderr}");

    if !output.status.success() {
        return Err(failed(format!("notarytool exited with {}: {}", output.status, stderr.trim())));
    }

    if let Some(status) = rejected_status(&stdout) {
        return Err(failed(format!("submission finished with status {status}")));
    }

    info!("Notarization accepted");
    Ok(())
}

/// Final `status:` line of notarytool output, if it is not `Accepted`.
fn rejected_status(output: &str) -> Option<&str> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("status:"))
        .map(str::trim)
        .last()
        .filter(|status| !status.eq_ignore_ascii_case("accepted"))
}
