//! Core types shared by every part of the updater
//!
//! The core module holds the error system used throughout the crate:
//! - [`UpdateError`] - enumerated failure modes of the update lifecycle and the builder
//! - [`ErrorContext`] - user-facing wrapper with details and suggestions
//! - [`user_friendly_error`] - convert any `anyhow::Error` for display
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundle_updater::core::{UpdateError, user_friendly_error};
//! use anyhow::Result;
//!
//! fn example_operation() -> Result<()> {
//!     Err(UpdateError::ConfigError {
//!         message: "source_url must not be empty".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = example_operation() {
//!     user_friendly_error(e).display();
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
