//! The update manifest published next to each archive.
//!
//! A manifest is a small JSON document named `darwin-<arch>.json` in the artifact
//! store:
//!
//! ```json
//! {
//!   "version": "1.4.0",
//!   "checksum": "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
//! }
//! ```
//!
//! `checksum` is the lowercase hex SHA-256 of the archive. The updater fetches the
//! manifest fresh on every check and never writes it to disk. The builder writes it
//! with [`Manifest::save`].

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::UpdateError;

/// Version and archive digest of a published update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Published version
    pub version: String,
    /// Hex SHA-256 of the archive
    pub checksum: String,
}

impl Manifest {
    /// Create a manifest.
    pub fn new(version: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            checksum: checksum.into(),
        }
    }

    /// Parse a manifest body fetched from `url`.
    ///
    /// Unknown keys are ignored so the store can publish extra metadata.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ManifestParse`] when the body is not a JSON object with
    /// string `version` and `checksum` fields.
    pub fn parse(body: &[u8], url: &str) -> Result<Self, UpdateError> {
        serde_json::from_slice(body).map_err(|e| UpdateError::ManifestParse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize as pretty-printed JSON with two-space indentation.
    ///
    /// # Errors
    ///
    /// Serialization of two strings cannot realistically fail; the error is surfaced
    /// as [`UpdateError::Other`] rather than panicking.
    pub fn to_json_pretty(&self) -> Result<String, UpdateError> {
        serde_json::to_string_pretty(self).map_err(|e| UpdateError::Other {
            message: format!("Failed to serialize manifest: {e}"),
        })
    }

    /// Write the manifest to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Io`] when the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), UpdateError> {
        let json = self.to_json_pretty()?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}
