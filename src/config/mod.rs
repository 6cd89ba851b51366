//! Updater configuration.
//!
//! Configuration comes in two layers:
//!
//! - [`UpdateSettings`] - the raw, serde-friendly form as written in `updater.toml` or
//!   filled in by an embedding application
//! - [`UpdateConfig`] - the validated, immutable form the updater works with. The
//!   source URL always ends with `/`, and both paths are absolute with `~/` and
//!   environment variables expanded
//!
//! # TOML Format
//!
//! ```toml
//! current_version = "1.4.0"
//! source_url = "https://downloads.example.com/myapp"
//! zip_file_name = "MyApp.zip"
//! download_path = "~/Library/Caches/MyApp/updates"
//! app_path = "/Applications/MyApp.app"
//!
//! # Optional
//! start_automatically = true
//! before_update_command = "pkill -f MyAppHelper"
//! after_update_command = "touch ~/Library/Caches/MyApp/updated"
//! wait_timeout_secs = 0
//! ```
//!
//! `wait_timeout_secs = 0` means the swap procedure waits for the application to exit
//! for as long as it takes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::UpdateError;
use crate::utils::platform::resolve_path;

/// Raw updater settings, before validation.
///
/// Missing optional keys fall back to [`Default`]: relaunch enabled, no hooks and
/// an unbounded wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    /// Version of the installed application
    pub current_version: String,
    /// Base URL of the artifact store
    pub source_url: String,
    /// File name of the update archive in the artifact store
    pub zip_file_name: String,
    /// Staging directory for downloads and the swap procedure
    pub download_path: String,
    /// Installed application bundle
    pub app_path: String,
    /// Relaunch the application after a successful swap
    pub start_automatically: bool,
    /// Shell command run by the swap procedure before the bundle is replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_update_command: Option<String>,
    /// Shell command run by the swap procedure after the bundle is replaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_update_command: Option<String>,
    /// Upper bound in seconds on waiting for the application to exit; `0` waits forever
    pub wait_timeout_secs: u64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            current_version: String::new(),
            source_url: String::new(),
            zip_file_name: String::new(),
            download_path: String::new(),
            app_path: String::new(),
            start_automatically: true,
            before_update_command: None,
            after_update_command: None,
            wait_timeout_secs: 0,
        }
    }
}

/// Validated updater configuration.
///
/// Immutable once constructed; the updater session holds it for its whole lifetime.
///
/// # Examples
///
/// ```rust,no_run
/// use bundle_updater::config::{UpdateConfig, UpdateSettings};
///
/// # fn example() -> Result<(), bundle_updater::core::UpdateError> {
/// let config = UpdateConfig::new(UpdateSettings {
///     current_version: "1.0.0".to_string(),
///     source_url: "https://downloads.example.com/myapp".to_string(),
///     zip_file_name: "MyApp.zip".to_string(),
///     download_path: "~/Library/Caches/MyApp/updates".to_string(),
///     app_path: "/Applications/MyApp.app".to_string(),
///     ..Default::default()
/// })?;
/// assert_eq!(config.source_url(), "https://downloads.example.com/myapp/");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConfig {
    current_version: String,
    source_url: String,
    zip_file_name: String,
    download_path: PathBuf,
    app_path: PathBuf,
    start_automatically: bool,
    before_update_command: Option<String>,
    after_update_command: Option<String>,
    wait_timeout_secs: u64,
}

impl UpdateConfig {
    /// Validate and normalize raw settings.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] when a required field is empty, when
    /// `zip_file_name` is not a plain file name, or when a path cannot be resolved.
    pub fn new(settings: UpdateSettings) -> Result<Self, UpdateError> {
        let UpdateSettings {
            current_version,
            source_url,
            zip_file_name,
            download_path,
            app_path,
            start_automatically,
            before_update_command,
            after_update_command,
            wait_timeout_secs,
        } = settings;

        require("current_version", &current_version)?;
        require("source_url", &source_url)?;
        require("zip_file_name", &zip_file_name)?;
        require("download_path", &download_path)?;
        require("app_path", &app_path)?;

        if Path::new(&zip_file_name).file_name().and_then(|n| n.to_str())
            != Some(zip_file_name.as_str())
        {
            return Err(UpdateError::ConfigError {
                message: format!("zip_file_name must be a plain file name, got '{zip_file_name}'"),
            });
        }

        let mut source_url = source_url.trim().to_string();
        if !source_url.ends_with('/') {
            source_url.push('/');
        }

        let config = Self {
            current_version: current_version.trim().to_string(),
            source_url,
            zip_file_name,
            download_path: resolve("download_path", &download_path)?,
            app_path: resolve("app_path", &app_path)?,
            start_automatically,
            before_update_command: non_blank(before_update_command),
            after_update_command: non_blank(after_update_command),
            wait_timeout_secs,
        };

        debug!(
            "Updater configured: version {} from {} staging in {}",
            config.current_version,
            config.source_url,
            config.download_path.display()
        );
        Ok(config)
    }

    /// Load and validate settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigError`] when the file cannot be read or parsed,
    /// or when the settings fail validation.
    pub fn load(path: &Path) -> Result<Self, UpdateError> {
        let content = std::fs::read_to_string(path).map_err(|e| UpdateError::ConfigError {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;

        let settings: UpdateSettings =
            toml::from_str(&content).map_err(|e| UpdateError::ConfigError {
                message: format!("Failed to parse {}: {e}", path.display()),
            })?;

        Self::new(settings)
    }

    /// Installed application version.
    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Artifact store base URL, always ending with `/`.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Archive file name.
    #[must_use]
    pub fn zip_file_name(&self) -> &str {
        &self.zip_file_name
    }

    /// Absolute staging directory.
    #[must_use]
    pub fn download_path(&self) -> &Path {
        &self.download_path
    }

    /// Absolute path of the installed bundle.
    #[must_use]
    pub fn app_path(&self) -> &Path {
        &self.app_path
    }

    /// Whether the swap procedure relaunches the application.
    #[must_use]
    pub const fn start_automatically(&self) -> bool {
        self.start_automatically
    }

    /// Command run before the bundle is replaced.
    #[must_use]
    pub fn before_update_command(&self) -> Option<&str> {
        self.before_update_command.as_deref()
    }

    /// Command run after the bundle is replaced.
    #[must_use]
    pub fn after_update_command(&self) -> Option<&str> {
        self.after_update_command.as_deref()
    }

    /// Wait bound in seconds; `0` is unbounded.
    #[must_use]
    pub const fn wait_timeout_secs(&self) -> u64 {
        self.wait_timeout_secs
    }
}

fn require(field: &str, value: &str) -> Result<(), UpdateError> {
    if value.trim().is_empty() {
        return Err(UpdateError::ConfigError {
            message: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

fn resolve(field: &str, value: &str) -> Result<PathBuf, UpdateError> {
    resolve_path(value.trim()).map_err(|e| UpdateError::ConfigError {
        message: format!("Cannot resolve {field}: {e:#}"),
    })
}

fn non_blank(command: Option<String>) -> Option<String> {
    command.filter(|c| !c.trim().is_empty())
}
