//! Error handling for the bundle updater
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`UpdateError`]) for every failure the update
//!    lifecycle can report, so embedding applications can branch on them
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for the command-line front end
//!
//! # Error Categories
//!
//! - **Checking**: [`UpdateError::Transport`], [`UpdateError::HttpStatus`],
//!   [`UpdateError::ManifestParse`], [`UpdateError::InvalidVersionFormat`]
//! - **Downloading**: [`UpdateError::NoUpdateAvailable`], [`UpdateError::StagingDir`],
//!   [`UpdateError::ChecksumMismatch`]
//! - **Applying**: [`UpdateError::StagingDirMissing`], [`UpdateError::ArchiveMissing`],
//!   [`UpdateError::InstalledBundleMissing`], [`UpdateError::Extraction`],
//!   [`UpdateError::BundleNotFound`], [`UpdateError::LaunchError`],
//!   [`UpdateError::HandoffError`]
//! - **Publishing**: [`UpdateError::InvalidBundle`], [`UpdateError::NotarizationFailed`]
//! - **Generic**: [`UpdateError::ConfigError`], [`UpdateError::Io`]
//!
//! Only the orchestrator's own phases report through this type. Failures inside the
//! detached swap procedure happen after the caller has exited and are visible only
//! in `update.log`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundle_updater::core::{UpdateError, user_friendly_error};
//!
//! let error = UpdateError::NoUpdateAvailable {
//!     current: "1.2.0".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Colored message with a suggestion
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for update operations
///
/// Every phase (check, download, apply) returns the first error it encounters
/// and performs no partial retry. The only automatic corrective action anywhere
/// in the lifecycle is deleting a corrupted download on
/// [`ChecksumMismatch`](UpdateError::ChecksumMismatch).
///
/// # Examples
///
/// ```rust,no_run
/// use bundle_updater::core::UpdateError;
///
/// fn describe(error: &UpdateError) -> &'static str {
///     match error {
///         UpdateError::Transport { .. } | UpdateError::HttpStatus { .. } => "network",
///         UpdateError::ChecksumMismatch { .. } => "integrity",
///         UpdateError::BundleNotFound { .. } => "archive layout",
///         _ => "other",
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The HTTP request could not be sent or its body could not be read
    ///
    /// There is no retry: a single failed request is terminal for the call.
    #[error("Network request to {url} failed: {reason}")]
    Transport {
        /// URL that was being fetched
        url: String,
        /// Underlying transport failure
        reason: String,
    },

    /// The artifact store answered with a status other than 200
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus {
        /// Status code returned by the server
        status: u16,
        /// URL that was being fetched
        url: String,
    },

    /// The manifest body is not the expected JSON document
    #[error("Invalid update manifest from {url}: {reason}")]
    ManifestParse {
        /// URL the manifest was fetched from
        url: String,
        /// Parser error
        reason: String,
    },

    /// A version string is not a semantic version, even after normalization
    ///
    /// Callers comparing externally authored manifests should treat this as a
    /// policy decision rather than a fatal error.
    #[error("Invalid semantic version: '{version}'")]
    InvalidVersionFormat {
        /// The offending version string, as given
        version: String,
    },

    /// Download was requested but the manifest does not describe a newer version
    #[error("No update available: version {current} is up to date")]
    NoUpdateAvailable {
        /// Currently installed version
        current: String,
    },

    /// The staging directory could not be created
    #[error("Cannot create staging directory {}: {reason}", .path.display())]
    StagingDir {
        /// Staging directory path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The downloaded archive does not match the manifest digest
    ///
    /// The archive has already been deleted when this error is returned. A
    /// corrupted or tampered artifact is never left where `apply` would find it.
    #[error("Checksum mismatch for downloaded update: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest recorded in the manifest
        expected: String,
        /// Digest of the bytes actually received (empty if it could not be computed)
        actual: String,
    },

    /// The staging directory required by `apply` does not exist
    #[error("Staging directory does not exist: {}", .path.display())]
    StagingDirMissing {
        /// Expected staging directory
        path: PathBuf,
    },

    /// No downloaded archive is present at the expected path
    #[error("No downloaded update found at {}", .path.display())]
    ArchiveMissing {
        /// Expected archive path
        path: PathBuf,
    },

    /// The installed application bundle is not where the config says it is
    #[error("Installed application not found at {}", .path.display())]
    InstalledBundleMissing {
        /// Configured application path
        path: PathBuf,
    },

    /// The archive could not be decompressed
    #[error("Failed to extract {}: {reason}", .archive.display())]
    Extraction {
        /// Archive being extracted
        archive: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The extracted archive does not contain an application bundle
    #[error("No .app bundle found in {}", .path.display())]
    BundleNotFound {
        /// Extraction directory that was scanned
        path: PathBuf,
    },

    /// The swap procedure process could not be started
    #[error("Failed to launch swap procedure {}: {reason}", .script.display())]
    LaunchError {
        /// Rendered procedure path
        script: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The swap procedure started but releasing its handle failed
    ///
    /// The detached process may still be running. This is a loss of visibility,
    /// not an inconsistency.
    #[error("Swap procedure started (pid {pid}) but its handle could not be released: {reason}")]
    HandoffError {
        /// PID of the detached procedure
        pid: u32,
        /// Underlying failure
        reason: String,
    },

    /// A swap procedure from an earlier apply is still running
    ///
    /// Starting another would race it for the staging directory and the journal.
    #[error("An update is already being applied by swap procedure (pid {pid})")]
    SwapInProgress {
        /// PID of the running procedure
        pid: u32,
    },

    /// The path given to the builder is not a usable application bundle
    #[error("Invalid application bundle {}: {reason}", .path.display())]
    InvalidBundle {
        /// Path that was given
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// The notarization service rejected the archive or could not be reached
    #[error("Notarization failed for {}: {reason}", .path.display())]
    NotarizationFailed {
        /// Archive that was submitted
        path: PathBuf,
        /// Tool output or exit status
        reason: String,
    },

    /// Configuration is incomplete or cannot be resolved
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// Generic filesystem failure (read, write, permissions)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure, used for errors that do not originate in the updater
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl UpdateError {
    /// Build a [`Transport`](UpdateError::Transport) error from a `reqwest` failure.
    pub(crate) fn transport(url: &str, err: &reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    /// Whether the error was caused by the network rather than local state.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::HttpStatus { .. })
    }
}

/// Error wrapper with user-facing details and a suggestion
///
/// Used by the command-line front end to present failures. Details render in
/// yellow and suggestions in green.
///
/// ```rust,no_run
/// use bundle_updater::core::{ErrorContext, UpdateError};
///
/// let ctx = ErrorContext::new(UpdateError::ConfigError {
///     message: "source_url is empty".to_string(),
/// })
/// .with_suggestion("Set source_url in updater.toml");
/// ctx.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// [`UpdateError`]s anywhere in the `anyhow` chain are recognized. Anything else
/// is rendered with its full context chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let chain = format!("{error:#}");

    match error.downcast::<UpdateError>() {
        Ok(update_error) => create_error_context(update_error),
        Err(other) => match other.downcast::<std::io::Error>() {
            Ok(io_error) if io_error.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorContext::new(UpdateError::Io(io_error))
                    .with_details(chain)
                    .with_suggestion(
                        "Check that the staging directory and the application path are writable",
                    )
            }
            Ok(io_error) => ErrorContext::new(UpdateError::Io(io_error)).with_details(chain),
            Err(_) => ErrorContext::new(UpdateError::Other { message: chain }),
        },
    }
}

fn create_error_context(error: UpdateError) -> ErrorContext {
    match &error {
        UpdateError::Transport { .. } => ErrorContext::new(error)
            .with_suggestion("Check your network connection and the configured source_url"),
        UpdateError::HttpStatus { status: 404, .. } => ErrorContext::new(error)
            .with_details("The artifact store has no file at this path")
            .with_suggestion(
                "Make sure the manifest and archive were published for this architecture",
            ),
        UpdateError::HttpStatus { .. } => ErrorContext::new(error)
            .with_suggestion("The artifact store rejected the request; try again later"),
        UpdateError::ManifestParse { .. } => ErrorContext::new(error).with_suggestion(
            "The manifest must be a JSON object with \"version\" and \"checksum\" fields",
        ),
        UpdateError::InvalidVersionFormat { .. } => ErrorContext::new(error)
            .with_suggestion("Use semantic versions such as 1.4.2 or v1.4.2-beta.1"),
        UpdateError::NoUpdateAvailable { .. } => ErrorContext::new(error)
            .with_suggestion("Run `bundle-updater check` to see the published version"),
        UpdateError::ChecksumMismatch { .. } => ErrorContext::new(error)
            .with_details("The corrupted download has been deleted")
            .with_suggestion("Retry the download; if it keeps failing, republish the manifest"),
        UpdateError::ArchiveMissing { .. } => ErrorContext::new(error)
            .with_suggestion("Run `bundle-updater download` before applying the update"),
        UpdateError::BundleNotFound { .. } => ErrorContext::new(error)
            .with_details("The archive must contain a single top-level .app directory")
            .with_suggestion("Rebuild the archive with `bundle-updater build`"),
        UpdateError::LaunchError { .. } => ErrorContext::new(error)
            .with_suggestion("Check that /bin/bash exists and the staging directory is writable"),
        UpdateError::HandoffError { .. } => ErrorContext::new(error)
            .with_details("The swap procedure may still complete; see update.log"),
        UpdateError::SwapInProgress { .. } => ErrorContext::new(error)
            .with_details("The pending update is applied once the application exits")
            .with_suggestion("Quit the application, or wait for the swap to finish and retry"),
        UpdateError::NotarizationFailed { .. } => ErrorContext::new(error).with_suggestion(
            "Check the keychain profile with `xcrun notarytool history --keychain-profile <name>`",
        ),
        _ => ErrorContext::new(error),
    }
}
