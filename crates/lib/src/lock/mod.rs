//! Versioned lock file persistence.
//!
//! The lock file (`plonk.lock`) records which packages and dotfiles plonk
//! manages. It lives next to `plonk.yaml` in the config directory.
//!
//! # Lock File Format
//!
//! Version 1 only knows about packages:
//!
//! ```yaml
//! version: 1
//! packages:
//!   brew:
//!     - name: jq
//!       version: "1.7"
//!       installed_at: 2024-01-01T00:00:00Z
//! ```
//!
//! Version 2 records every managed item as a resource:
//!
//! ```yaml
//! version: 2
//! resources:
//!   - type: package
//!     id: brew:jq
//!     name: jq
//!     state: managed
//!     installed_at: 2024-01-01T00:00:00Z
//!     metadata:
//!       manager: brew
//!       name: jq
//!       version: "1.7"
//! ```
//!
//! Both versions are read. Writes always produce version 2.

mod record;
mod store;

use std::io;

use thiserror::Error;

pub use record::*;
pub use store::*;

/// Errors that can occur when working with lock files.
#[derive(Debug, Error)]
pub enum LockError {
  /// Failed to read the lock file.
  #[error("failed to read lock file: {0}")]
  Read(#[source] io::Error),

  /// Failed to write the lock file.
  #[error("failed to write lock file: {0}")]
  Write(#[source] io::Error),

  /// Failed to parse the lock file YAML.
  #[error("failed to parse lock file: {0}")]
  Parse(#[source] serde_yaml::Error),

  /// Failed to serialize the lock file.
  #[error("failed to serialize lock file: {0}")]
  Serialize(#[source] serde_yaml::Error),

  /// The `version` field is present but not a non-negative integer.
  #[error("invalid lock file version: {0}")]
  InvalidVersion(String),

  /// Lock file version is not supported.
  #[error("unsupported lock file version {0}, expected {LEGACY_LOCK_VERSION} or {LOCK_VERSION}")]
  UnsupportedVersion(u32),

  /// A legacy entry could not be converted to a resource.
  #[error("failed to migrate lock entry under '{manager}': {reason}")]
  Migration { manager: String, reason: String },
}
