//! Test utilities for bundle-updater
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.
//!
//! - [`TestEnvironment`] - a sandbox with an installed bundle, a staging directory
//!   and a publishing directory
//! - [`BundleFixture`] - builds fake `.app` bundles and their archives
//! - [`init_test_logging`] - opt-in tracing output for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use bundle_updater::test_utils::TestEnvironment;
//!
//! # fn example() -> anyhow::Result<()> {
//! let env = TestEnvironment::new()?;
//! let config = env.config("http://127.0.0.1:8080", "1.0.0")?;
//! assert!(config.app_path().join("Contents/Info.plist").exists());
//! # Ok(())
//! # }
//! ```

pub mod environment;
pub mod fixtures;

pub use environment::TestEnvironment;
pub use fixtures::BundleFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`. Without either nothing is logged.
///
/// ```bash
/// RUST_LOG=bundle_updater=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
