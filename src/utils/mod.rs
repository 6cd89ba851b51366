//! Utility modules shared by the updater and the builder.
//!
//! - [`archive`] - ZIP compression and extraction preserving modes and symlinks
//! - [`checksum`] - streaming SHA-256 digests and digest comparison
//! - [`platform`] - architecture naming, artifact names and path resolution
//! - [`process`] - detached process launch and PID liveness
//! - [`progress`] - terminal progress indicators

pub mod archive;
pub mod checksum;
pub mod platform;
pub mod process;
pub mod progress;

pub use checksum::{checksums_match, compute_sha256};
pub use platform::{arch_name, manifest_file_name, resolve_path};
