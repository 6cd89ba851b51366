//! Platform helpers: architecture naming, artifact names and path resolution.
//!
//! The artifact store is laid out per architecture, using the naming convention of
//! the publishing toolchain rather than Rust's target names:
//!
//! | `std::env::consts::ARCH` | Artifact name |
//! |---|---|
//! | `aarch64` | `arm64` |
//! | `x86_64` | `amd64` |
//!
//! so an Apple Silicon installation reads `darwin-arm64.json`.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Prefix shared by every manifest file name.
pub const MANIFEST_PREFIX: &str = "darwin";

/// Architecture name used in artifact file names for the running machine.
///
/// Unknown architectures pass through unchanged.
#[must_use]
pub fn arch_name() -> &'static str {
    normalize_arch(std::env::consts::ARCH)
}

/// Map a Rust architecture name to the artifact naming convention.
#[must_use]
pub fn normalize_arch(arch: &str) -> &str {
    match arch {
        "aarch64" => "arm64",
        "x86_64" => "amd64",
        other => other,
    }
}

/// Manifest file name for the running architecture, e.g. `darwin-arm64.json`.
#[must_use]
pub fn manifest_file_name() -> String {
    format!("{MANIFEST_PREFIX}-{}.json", arch_name())
}

/// Get the home directory of the current user.
///
/// # Errors
///
/// Fails when the home directory cannot be determined, for example when `HOME` is
/// unset in a stripped-down service environment.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine home directory.\n\n\
            Make sure the HOME environment variable is set"
        )
    })
}

/// Resolve a user-supplied path to an absolute path.
///
/// Handles `~/` home expansion and `$VAR`/`${VAR}` environment expansion, then makes
/// the result absolute against the current working directory. The path does not
/// need to exist.
///
/// # Errors
///
/// - `~user/...` forms, which are not supported
/// - undefined environment variables
/// - the working directory cannot be read while absolutizing a relative path
///
/// # Examples
///
/// ```rust,no_run
/// use bundle_updater::utils::platform::resolve_path;
///
/// # fn example() -> anyhow::Result<()> {
/// let staging = resolve_path("~/Library/Caches/MyApp/updates")?;
/// assert!(staging.is_absolute());
/// # Ok(())
/// # }
/// ```
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = if let Some(stripped) = path.strip_prefix("~/") {
        get_home_dir()?.join(stripped)
    } else if path == "~" {
        get_home_dir()?
    } else if path.starts_with('~') {
        return Err(anyhow::anyhow!(
            "Invalid path: {path}\n\n\
            Tilde expansion only supports '~/' for the home directory"
        ));
    } else {
        PathBuf::from(path)
    };

    let path_str = expanded.to_string_lossy();
    let expanded_str = shellexpand::env(&path_str)
        .with_context(|| {
            format!(
                "Failed to expand environment variables in path: {path_str}\n\n\
                Check for undefined variables (use $VAR or ${{VAR}})"
            )
        })?
        .into_owned();

    std::path::absolute(&expanded_str)
        .with_context(|| format!("Failed to make path absolute: {expanded_str}"))
}

/// Check whether a command is available on `PATH`.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}
