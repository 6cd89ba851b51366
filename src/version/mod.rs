//! Semantic version comparison for update manifests.
//!
//! Published manifests are authored by hand or by CI, so version strings arrive in a
//! few spellings. Before comparison every string is normalized:
//!
//! - a leading `v` or `V` marker is removed (`v1.4.0` → `1.4.0`)
//! - shorthand versions are completed (`1` → `1.0.0`, `1.4` → `1.4.0`), but only when
//!   there is no pre-release or build suffix
//! - build metadata is ignored for ordering (`1.0.0+ci.7` equals `1.0.0`)
//!
//! Pre-releases order before their release, so `1.0.0-beta` → `1.0.0` is an update.
//!
//! # Examples
//!
//! ```rust
//! use bundle_updater::version::is_newer;
//!
//! # fn example() -> Result<(), bundle_updater::core::UpdateError> {
//! assert!(is_newer("1.0.0", "v1.1.0")?);
//! assert!(!is_newer("1.2.0", "1.2.0")?);
//! assert!(is_newer("1.0.0-beta", "1.0.0")?);
//! assert!(!is_newer("2.0.0", "1.9")?);
//! # Ok(())
//! # }
//! ```

use semver::{BuildMetadata, Version};

use crate::core::UpdateError;

/// Parse a version string after normalization.
///
/// # Errors
///
/// Returns [`UpdateError::InvalidVersionFormat`] carrying the original input when the
/// string is not a semantic version even after normalization.
///
/// # Examples
///
/// ```rust
/// use bundle_updater::version::parse_version;
///
/// let version = parse_version("v2.1").unwrap();
/// assert_eq!(version.to_string(), "2.1.0");
/// ```
pub fn parse_version(version: &str) -> Result<Version, UpdateError> {
    let invalid = || UpdateError::InvalidVersionFormat {
        version: version.to_string(),
    };

    let trimmed = version.trim();
    let cleaned = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    let completed = complete_shorthand(cleaned).ok_or_else(invalid)?;
    let mut parsed = Version::parse(&completed).map_err(|_| invalid())?;
    parsed.build = BuildMetadata::EMPTY;
    Ok(parsed)
}

/// Expand `MAJOR` and `MAJOR.MINOR` to a full triple.
///
/// Returns `None` for a shorthand carrying a suffix (`1.2-beta`), which stays invalid.
fn complete_shorthand(version: &str) -> Option<String> {
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    let components = version[..core_end].split('.').count();

    match components {
        3 => Some(version.to_string()),
        1 | 2 if core_end < version.len() => None,
        1 => Some(format!("{version}.0.0")),
        2 => Some(format!("{version}.0")),
        _ => None,
    }
}

/// Report whether `candidate` is strictly newer than `current`.
///
/// Equal versions are not newer. Downgrades are never reported as updates.
///
/// # Errors
///
/// Returns [`UpdateError::InvalidVersionFormat`] when either string fails to parse.
/// Callers that must still make a decision (such as the update checker) treat any
/// difference between the raw strings as an update in that case.
pub fn is_newer(current: &str, candidate: &str) -> Result<bool, UpdateError> {
    let current = parse_version(current)?;
    let candidate = parse_version(candidate)?;
    Ok(candidate > current)
}
