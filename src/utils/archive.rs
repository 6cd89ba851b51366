//! ZIP compression and extraction of application bundles.
//!
//! Bundles carry executable bits and framework symlinks (`Versions/Current -> A`),
//! both of which must survive a round trip or the relaunched application will not
//! start. Entries therefore record Unix modes, and symlinks are stored as symlink
//! entries instead of being followed.
//!
//! Archives produced by [`create_archive`] contain the bundle directory itself as the
//! single top-level entry (`MyApp.app/`, `MyApp.app/Contents/...`), which is the
//! layout the updater expects when it locates the new bundle after extraction.
//!
//! Extraction rejects entries that would land outside the destination directory,
//! including symlinks whose target escapes it and entries whose path runs through a
//! symlink extracted earlier.
//!
//! Both operations are blocking and run on tokio's blocking pool.

use anyhow::{Context, Result, bail};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Compress `source_dir` into a new ZIP file at `archive_path`.
///
/// Entry names are relative to the parent of `source_dir`, so the directory itself
/// becomes the top-level entry.
///
/// # Errors
///
/// Fails if `source_dir` is not a directory, or if reading the tree or writing the
/// archive fails.
///
/// # Examples
///
/// ```rust,no_run
/// use bundle_updater::utils::archive::create_archive;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// create_archive(Path::new("build/MyApp.app"), Path::new("dist/MyApp.zip")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_archive(source_dir: &Path, archive_path: &Path) -> Result<()> {
    let source_dir = source_dir.to_path_buf();
    let archive_path = archive_path.to_path_buf();

    tokio::task::spawn_blocking(move || zip_directory(&source_dir, &archive_path))
        .await
        .context("Archive task panicked")?
}

/// Extract `archive_path` into `dest_dir`, creating it if needed.
///
/// # Errors
///
/// Fails if the archive cannot be read, an entry path is unsafe, or writing any
/// extracted file fails.
pub async fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let archive_path = archive_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    tokio::task::spawn_blocking(move || unzip_file(&archive_path, &dest_dir))
        .await
        .context("Extraction task panicked")?
}

/// Blocking implementation of [`create_archive`].
pub fn zip_directory(source_dir: &Path, archive_path: &Path) -> Result<()> {
    if !source_dir.is_dir() {
        bail!("Not a directory: {}", source_dir.display());
    }

    let base = source_dir.parent().unwrap_or_else(|| Path::new(""));
    let file = File::create(archive_path)
        .with_context(|| format!("Failed to create archive: {}", archive_path.display()))?;
    let mut zip = ZipWriter::new(file);

    let mut entries = 0usize;
    for entry in WalkDir::new(source_dir).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", source_dir.display()))?;
        let path = entry.path();
        let name = entry_name(base, path)?;
        let metadata = fs::symlink_metadata(path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(file_mode(&metadata));

        if metadata.file_type().is_symlink() {
            let target = fs::read_link(path)
                .with_context(|| format!("Failed to read symlink: {}", path.display()))?;
            zip.add_symlink(name, target.to_string_lossy().into_owned(), options)
                .with_context(|| format!("Failed to add symlink {}", path.display()))?;
        } else if metadata.is_dir() {
            zip.add_directory(format!("{name}/"), options)
                .with_context(|| format!("Failed to add directory {}", path.display()))?;
        } else {
            zip.start_file(name, options)
                .with_context(|| format!("Failed to add file {}", path.display()))?;
            let mut source = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            io::copy(&mut source, &mut zip)
                .with_context(|| format!("Failed to compress {}", path.display()))?;
        }
        entries += 1;
    }

    zip.finish().context("Failed to finalize archive")?;
    debug!("Wrote {entries} entries to {}", archive_path.display());
    Ok(())
}

/// Blocking implementation of [`extract_archive`].
pub fn unzip_file(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Not a valid ZIP archive: {}", archive_path.display()))?;

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("Failed to read archive entry {index}"))?;

        let Some(relative) = entry.enclosed_name() else {
            bail!("Archive entry escapes the destination: {}", entry.name());
        };
        ensure_no_symlink_components(dest_dir, &relative)?;
        let out_path = dest_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .with_context(|| format!("Failed to create {}", out_path.display()))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mode = entry.unix_mode();
        if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .with_context(|| format!("Failed to read symlink entry {}", entry.name()))?;
            ensure_link_inside(&relative, Path::new(&target))?;
            make_symlink(Path::new(&target), &out_path)?;
            continue;
        }

        let mut out_file = File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        io::copy(&mut entry, &mut out_file)
            .with_context(|| format!("Failed to extract {}", out_path.display()))?;
        drop(out_file);

        if let Some(mode) = mode {
            set_mode(&out_path, mode)?;
        }
    }

    debug!(
        "Extracted {} entries from {} into {}",
        archive.len(),
        archive_path.display(),
        dest_dir.display()
    );
    Ok(())
}

fn entry_name(base: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(base)
        .with_context(|| format!("{} is outside {}", path.display(), base.display()))?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Reject an entry whose path passes through a symlink already extracted.
///
/// [`ensure_link_inside`] checks each link on its own; a chain such as `x -> .`
/// followed by `x/y -> ..` only escapes when entries are written through it.
fn ensure_no_symlink_components(dest_dir: &Path, relative: &Path) -> Result<()> {
    let mut current = dest_dir.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                bail!(
                    "Archive entry {} passes through symlink {}",
                    relative.display(),
                    current.display()
                );
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to inspect {}", current.display()));
            }
        }
    }
    Ok(())
}

/// Reject link targets that resolve outside the extraction root.
fn ensure_link_inside(link: &Path, target: &Path) -> Result<()> {
    if target.is_absolute() {
        bail!("Symlink {} has an absolute target {}", link.display(), target.display());
    }

    let mut depth: usize = link.components().count().saturating_sub(1);
    for component in target.components() {
        match component {
            Component::ParentDir => {
                if depth == 0 {
                    bail!(
                        "Symlink {} points outside the archive: {}",
                        link.display(),
                        target.display()
                    );
                }
                depth -= 1;
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.is_dir() { 0o755 } else { 0o644 }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("Failed to create symlink {}", link.display()))
}

#[cfg(not(unix))]
fn make_symlink(target: &Path, link: &Path) -> Result<()> {
    bail!(
        "Symlinks are not supported on this platform: {} -> {}",
        link.display(),
        target.display()
    )
}
