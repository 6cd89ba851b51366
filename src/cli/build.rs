//! `build` command: package a bundle for publishing.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::builder::{BuildOptions, build_package};

/// Package a bundle and write its update manifest.
///
/// Writes `<output-name>.zip` and `darwin-<arch>.json` into the output directory.
/// Upload both to the location clients use as `source_url`.
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Application bundle to package (must end with .app)
    #[arg(long, value_name = "PATH")]
    pub app_path: PathBuf,

    /// Version recorded in the manifest
    #[arg(long = "version", value_name = "VERSION")]
    pub app_version: String,

    /// Archive name without extension (defaults to the bundle name)
    #[arg(long, value_name = "NAME")]
    pub output_name: Option<String>,

    /// Keychain profile for notarization; notarization is skipped without it
    #[arg(long, value_name = "PROFILE")]
    pub keychain_profile: Option<String>,

    /// Directory receiving the archive and manifest
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

impl BuildCommand {
    pub async fn execute(self) -> Result<()> {
        let options = BuildOptions {
            app_path: self.app_path,
            version: self.app_version,
            output_name: self.output_name,
            output_dir: self.output_dir,
            keychain_profile: self.keychain_profile,
        };

        let output = build_package(&options)
            .await
            .with_context(|| format!("Failed to build package for {}", options.app_path.display()))?;

        println!("{}", "Package built".green().bold());
        println!("  Archive:   {}", output.archive_path.display());
        println!("  Manifest:  {}", output.manifest_path.display());
        println!("  Version:   {}", output.manifest.version);
        println!("  Checksum:  {}", output.manifest.checksum);
        println!("  Notarized: {}", if output.notarized { "yes" } else { "no" });
        println!();
        println!("Upload both files to your update server.");
        Ok(())
    }
}
