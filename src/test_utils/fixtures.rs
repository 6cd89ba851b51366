//! Fake application bundles and update archives.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::archive::zip_directory;
use crate::utils::checksum::sha256_hex;

/// A minimal `.app` bundle: `Info.plist` plus an executable whose output names the
/// version, so a test can tell which bundle ended up installed.
#[derive(Debug, Clone)]
pub struct BundleFixture {
    /// Bundle name without `.app`
    pub name: String,
    /// Version written into the bundle
    pub version: String,
}

impl BundleFixture {
    /// Describe a bundle.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Directory name of the bundle.
    #[must_use]
    pub fn dir_name(&self) -> String {
        format!("{}.app", self.name)
    }

    /// Create the bundle inside `parent` and return its path.
    pub fn write_to(&self, parent: &Path) -> Result<PathBuf> {
        let bundle = parent.join(self.dir_name());
        let macos = bundle.join("Contents/MacOS");
        fs::create_dir_all(&macos)
            .with_context(|| format!("Failed to create {}", macos.display()))?;

        fs::write(
            bundle.join("Contents/Info.plist"),
            format!(
                "<?xml version=\"1.0\"?>\n<plist version=\"1.0\"><dict>\
                 <key>CFBundleShortVersionString</key><string>{}</string>\
                 </dict></plist>\n",
                self.version
            ),
        )?;

        let executable = macos.join(&self.name);
        fs::write(&executable, format!("#!/bin/sh\necho {}\n", self.version))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&executable, fs::Permissions::from_mode(0o755))?;
        }

        Ok(bundle)
    }

    /// Build the bundle in a scratch directory under `work_dir` and compress it to
    /// `archive_path`. Returns the archive bytes and their SHA-256.
    pub fn write_archive(&self, work_dir: &Path, archive_path: &Path) -> Result<(Vec<u8>, String)> {
        let scratch = work_dir.join(format!("fixture-{}-{}", self.name, self.version));
        fs::create_dir_all(&scratch)?;
        let bundle = self.write_to(&scratch)?;
        zip_directory(&bundle, archive_path)?;

        let bytes = fs::read(archive_path)?;
        let checksum = sha256_hex(&bytes);
        Ok((bytes, checksum))
    }

    /// Version recorded in an installed bundle's `Info.plist`.
    pub fn installed_version(bundle: &Path) -> Result<String> {
        let plist = fs::read_to_string(bundle.join("Contents/Info.plist"))
            .with_context(|| format!("No Info.plist in {}", bundle.display()))?;
        let start = plist
            .find("<string>")
            .map(|i| i + "<string>".len())
            .context("Info.plist has no version")?;
        let end = plist[start..].find("</string>").context("Info.plist is truncated")?;
        Ok(plist[start..start + end].to_string())
    }
}
