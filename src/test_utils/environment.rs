//! Sandboxed directories for updater tests.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use super::fixtures::BundleFixture;
use crate::config::{UpdateConfig, UpdateSettings};

/// Name of the bundle installed by [`TestEnvironment::new`].
pub const APP_NAME: &str = "Sample";

/// A temporary installation:
///
/// ```text
/// <temp>/
/// ├── Applications/Sample.app   installed bundle (version 1.0.0)
/// ├── staging/                  download_path (not created)
/// └── publish/                  scratch space for building archives
/// ```
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub app_path: PathBuf,
    pub staging_dir: PathBuf,
    pub publish_dir: PathBuf,
}

impl TestEnvironment {
    /// Create the sandbox with version 1.0.0 installed.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let applications = temp_dir.path().join("Applications");
        let staging_dir = temp_dir.path().join("staging");
        let publish_dir = temp_dir.path().join("publish");
        fs::create_dir_all(&applications)?;
        fs::create_dir_all(&publish_dir)?;

        let app_path = BundleFixture::new(APP_NAME, "1.0.0").write_to(&applications)?;

        Ok(Self {
            temp_dir,
            app_path,
            staging_dir,
            publish_dir,
        })
    }

    /// Raw settings pointing at this sandbox. Relaunch is disabled.
    #[must_use]
    pub fn settings(&self, source_url: &str, current_version: &str) -> UpdateSettings {
        UpdateSettings {
            current_version: current_version.to_string(),
            source_url: source_url.to_string(),
            zip_file_name: format!("{APP_NAME}.zip"),
            download_path: self.staging_dir.to_string_lossy().into_owned(),
            app_path: self.app_path.to_string_lossy().into_owned(),
            start_automatically: false,
            ..Default::default()
        }
    }

    /// Validated configuration pointing at this sandbox.
    pub fn config(&self, source_url: &str, current_version: &str) -> Result<UpdateConfig> {
        Ok(UpdateConfig::new(self.settings(source_url, current_version))?)
    }

    /// Build an archive of `Sample.app` at `version` in the publish directory.
    ///
    /// Returns the archive bytes and their SHA-256.
    pub fn publish_archive(&self, version: &str) -> Result<(Vec<u8>, String)> {
        let archive = self.publish_dir.join(format!("{APP_NAME}-{version}.zip"));
        BundleFixture::new(APP_NAME, version).write_archive(&self.publish_dir, &archive)
    }

    /// Write an updater.toml for this sandbox and return its path.
    pub fn write_config_file(&self, source_url: &str, current_version: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join("updater.toml");
        let content = toml::to_string(&self.settings(source_url, current_version))?;
        fs::write(&path, content)?;
        Ok(path)
    }
}
