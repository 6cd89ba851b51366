//! Packaging and publishing of application bundles.
//!
//! The builder produces the two artifacts the updater consumes:
//!
//! - `<output-name>.zip` - the bundle, compressed with the bundle directory as the
//!   top-level entry
//! - `darwin-<arch>.json` - the [`Manifest`] with the version and the archive's SHA-256
//!
//! Optionally the archive is notarized before its digest is taken, so the manifest
//! describes exactly the bytes that will be uploaded.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundle_updater::builder::{BuildOptions, build_package};
//!
//! # async fn example() -> Result<(), bundle_updater::core::UpdateError> {
//! let output = build_package(&BuildOptions {
//!     app_path: "build/MyApp.app".into(),
//!     version: "1.4.0".to_string(),
//!     output_name: None,
//!     output_dir: "dist".into(),
//!     keychain_profile: None,
//! })
//! .await?;
//! println!("{} -> {}", output.archive_path.display(), output.manifest.checksum);
//! # Ok(())
//! # }
//! ```

pub mod notarize;

use std::path::PathBuf;
use tracing::{info, warn};

use crate::core::UpdateError;
use crate::manifest::Manifest;
use crate::utils::archive::create_archive;
use crate::utils::checksum::compute_sha256;
use crate::utils::platform::manifest_file_name;
use crate::version::parse_version;

/// Inputs of [`build_package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Bundle to package; must be a directory ending in `.app`
    pub app_path: PathBuf,
    /// Version recorded in the manifest
    pub version: String,
    /// Archive base name; defaults to the bundle name without `.app`
    pub output_name: Option<String>,
    /// Directory receiving the archive and manifest; created if missing
    pub output_dir: PathBuf,
    /// Keychain profile for notarization; `None` skips notarization
    pub keychain_profile: Option<String>,
}

/// Artifacts written by [`build_package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// The archive
    pub archive_path: PathBuf,
    /// The manifest file
    pub manifest_path: PathBuf,
    /// Manifest contents
    pub manifest: Manifest,
    /// Whether the archive was notarized
    pub notarized: bool,
}

/// Package a bundle and write its manifest.
///
/// # Errors
///
/// - [`UpdateError::InvalidBundle`] if `app_path` is not an existing `.app` directory
/// - [`UpdateError::Io`] if the output directory or manifest cannot be written
/// - [`UpdateError::Other`] if compression fails
/// - [`UpdateError::NotarizationFailed`] if notarization was requested and failed
pub async fn build_package(options: &BuildOptions) -> Result<BuildOutput, UpdateError> {
    let app_path = &options.app_path;
    let invalid = |reason: &str| UpdateError::InvalidBundle {
        path: app_path.clone(),
        reason: reason.to_string(),
    };

    if !app_path.exists() {
        return Err(invalid("path does not exist"));
    }
    if !app_path.is_dir() {
        return Err(invalid("not a directory"));
    }
    let bundle_stem = match (app_path.file_stem(), app_path.extension()) {
        (Some(stem), Some(ext)) if ext == "app" => stem.to_string_lossy().into_owned(),
        _ => return Err(invalid("name must end with .app")),
    };

    if parse_version(&options.version).is_err() {
        warn!(
            "'{}' is not a semantic version; clients will treat any different version as an update",
            options.version
        );
    }

    let output_name = options.output_name.clone().unwrap_or(bundle_stem);
    tokio::fs::create_dir_all(&options.output_dir).await?;
    let archive_path = options.output_dir.join(format!("{output_name}.zip"));

    info!("Compressing {} into {}", app_path.display(), archive_path.display());
    create_archive(app_path, &archive_path).await.map_err(|e| UpdateError::Other {
        message: format!("Failed to create {}: {e:#}", archive_path.display()),
    })?;

    let notarized = match &options.keychain_profile {
        Some(profile) => {
            notarize::notarize(&archive_path, profile).await?;
            true
        }
        None => false,
    };

    let checksum = compute_sha256(&archive_path).await?;
    let manifest = Manifest::new(options.version.clone(), checksum);
    let manifest_path = options.output_dir.join(manifest_file_name());
    manifest.save(&manifest_path).await?;
    info!("Wrote manifest {}", manifest_path.display());

    Ok(BuildOutput {
        archive_path,
        manifest_path,
        manifest,
        notarized,
    })
}
