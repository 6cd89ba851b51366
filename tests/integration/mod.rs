//! Integration test suite for bundle-updater
//!
//! End-to-end tests of the update lifecycle against a mock artifact store
//! (`wiremock`), the swap procedure run for real under `/bin/bash`, the builder, and
//! the command-line binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=bundle_updater=debug cargo test --test integration -- --nocapture
//! ```
//!
//! # Test Organization
//!
//! - **check**: manifest fetching and version decisions
//! - **download**: streaming download, checksum verification and cleanup
//! - **apply**: preconditions, extraction and the detached swap, end to end
//! - **swap_script**: the swap procedure's rollback, abort and hook behavior
//! - **recovery**: repairing a swap interrupted between its two renames
//! - **builder**: packaging and manifest generation
//! - **cli**: the `bundle-updater` binary


mod apply;
mod check;
mod cli;
mod recovery;
