//! SHA-256 integrity verification.
//!
//! Digests are computed by streaming the file in fixed-size chunks, so archives of
//! any size are hashed in constant memory. Comparison against a published digest is
//! ASCII case-insensitive and ignores surrounding whitespace.

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
///
/// # Examples
///
/// ```rust,no_run
/// use bundle_updater::utils::checksum::compute_sha256;
/// use std::path::Path;
///
/// # async fn example() -> std::io::Result<()> {
/// let digest = compute_sha256(Path::new("MyApp.zip")).await?;
/// assert_eq!(digest.len(), 64);
/// # Ok(())
/// # }
/// ```
pub async fn compute_sha256(path: &Path) -> std::io::Result<String> {
    debug!("Computing SHA-256 for {}", path.display());

    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the lowercase hex SHA-256 digest of an in-memory buffer.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compare two hex digests, ignoring ASCII case and surrounding whitespace.
#[must_use]
pub fn checksums_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}
