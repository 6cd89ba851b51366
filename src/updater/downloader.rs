//! Archive download and integrity verification.

use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::Updater;
use crate::core::UpdateError;
use crate::utils::checksum::{checksums_match, compute_sha256};
use crate::utils::progress::ProgressBar;

impl Updater {
    /// Download the archive into the staging directory and verify it.
    ///
    /// Runs [`check_for_update`](Updater::check_for_update) first when no manifest is
    /// cached. The destination file is created before the request is sent and is
    /// filled as the body streams in. The digest of the finished file must match the
    /// manifest checksum (ignoring case).
    ///
    /// # Errors
    ///
    /// - [`UpdateError::NoUpdateAvailable`] if the implicit check finds no update
    /// - [`UpdateError::StagingDir`] if the staging directory cannot be created
    /// - [`UpdateError::Transport`] or [`UpdateError::HttpStatus`] for network
    ///   failures; a partially written file is left in place
    /// - [`UpdateError::ChecksumMismatch`] if the digest differs or cannot be
    ///   computed; the file has been deleted
    /// - [`UpdateError::Io`] if writing the file fails
    pub async fn download_update(&mut self) -> Result<(), UpdateError> {
        if self.manifest.is_none() {
            self.check_for_update().await?.ok_or_else(|| UpdateError::NoUpdateAvailable {
                current: self.config.current_version().to_string(),
            })?;
        }
        let Some(expected) = self.manifest.as_ref().map(|m| m.checksum.clone()) else {
            return Err(UpdateError::NoUpdateAvailable {
                current: self.config.current_version().to_string(),
            });
        };

        let staging = self.config.download_path();
        tokio::fs::create_dir_all(staging).await.map_err(|e| UpdateError::StagingDir {
            path: staging.to_path_buf(),
            reason: e.to_string(),
        })?;

        let zip_path = self.zip_path();
        let url = self.archive_url();
        info!("Downloading {url} to {}", zip_path.display());

        let mut file = tokio::fs::File::create(&zip_path).await?;

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

        let progress = if self.show_progress {
            let bar = ProgressBar::download(response.content_length());
            bar.set_message("Downloading update");
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpdateError::transport(&url, &e))?;
            file.write_all(&chunk).await?;
            progress.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);
        progress.finish_and_clear();
        debug!("Received {} bytes", progress.position());

        verify_download(&zip_path, &expected).await?;
        info!("Update downloaded and verified");
        Ok(())
    }
}

/// Check the digest of `path`; delete the file unless it matches.
async fn verify_download(path: &Path, expected: &str) -> Result<(), UpdateError> {
    let actual = match compute_sha256(path).await {
        Ok(actual) => actual,
        Err(e) => {
            warn!("Cannot compute checksum of {}: {e}", path.display());
            discard(path).await;
            return Err(UpdateError::ChecksumMismatch {
                expected: expected.to_string(),
                actual: String::new(),
            });
        }
    };

    if !checksums_match(expected, &actual) {
        warn!("Checksum mismatch for {}: expected {expected}, got {actual}", path.display());
        discard(path).await;
        return Err(UpdateError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }

    Ok(())
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Could not delete rejected download {}: {e}", path.display());
    }
}
