//! Update checking against the published manifest.

use tracing::{debug, info, warn};

use super::Updater;
use crate::core::UpdateError;
use crate::manifest::Manifest;
use crate::version;

impl Updater {
    /// Fetch the manifest and report whether it describes a newer version.
    ///
    /// Issues exactly one GET to [`manifest_url`](Updater::manifest_url). On success
    /// the manifest replaces any previously cached one, even when it is not newer.
    /// Returns `Some(version)` for an update and `None` when the installed version is
    /// current (or newer).
    ///
    /// Version strings that are not semantic versions are compared as plain strings:
    /// any difference counts as an update.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Transport`] if the request fails or the body cannot be read
    /// - [`UpdateError::HttpStatus`] for any status other than 200
    /// - [`UpdateError::ManifestParse`] if the body is not a valid manifest
    pub async fn check_for_update(&mut self) -> Result<Option<String>, UpdateError> {
        let url = self.manifest_url();
        debug!("Checking for updates at {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpdateError::transport(&url, &e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(UpdateError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await.map_err(|e| UpdateError::transport(&url, &e))?;
        let manifest = Manifest::parse(&body, &url)?;

        let current = self.config.current_version();
        let newer = match version::is_newer(current, &manifest.version) {
            Ok(newer) => newer,
            Err(e) => {
                warn!("{e}; comparing versions as plain strings");
                manifest.version != current
            }
        };

        let latest = manifest.version.clone();
        self.manifest = Some(manifest);

        if newer {
            info!("Update available: {current} -> {latest}");
            Ok(Some(latest))
        } else {
            info!("Version {current} is up to date (published: {latest})");
            Ok(None)
        }
    }
}
