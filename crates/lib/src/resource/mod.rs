//! Resources: one per domain, each able to say what should exist, what does
//! exist, and how to converge a single item.

pub mod dotfiles;
pub mod packages;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::lock::ResourceEntry;
use crate::managers::{ManagerError, RegistryError};
use crate::types::{Domain, Item};

pub use dotfiles::{DotfileResource, FileComparator};
pub use packages::PackageResource;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
  #[error(transparent)]
  Manager(#[from] ManagerError),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error("{item} timed out after {timeout:?}")]
  Timeout { item: String, timeout: Duration },

  #[error("applying {item} was cancelled")]
  Cancelled { item: String },

  #[error("failed to access {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to scan {path}: {source}")]
  Scan {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("invalid ignore pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("{item} is missing {field} metadata")]
  MissingMetadata { item: String, field: &'static str },

  #[error("{item} belongs to the {domain} domain")]
  WrongDomain { item: String, domain: Domain },
}

impl ResourceError {
  pub fn is_cancelled(&self) -> bool {
    match self {
      ResourceError::Cancelled { .. } => true,
      ResourceError::Manager(err) => err.is_cancelled(),
      _ => false,
    }
  }
}

/// What applying one item did.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
  /// A missing item now exists. Carries its lock entry.
  Added(ResourceEntry),
  /// A drifted item was brought back in line. Carries its lock entry.
  Updated(ResourceEntry),
  /// An untracked item was removed. Carries the lock id to drop.
  Removed(String),
  /// Nothing was done, for the given reason.
  Skipped(String),
}

/// One domain of reconcilable items.
#[async_trait]
pub trait Resource: Send + Sync {
  fn id(&self) -> &str;

  fn domain(&self) -> Domain;

  /// Items that should exist.
  fn desired(&self) -> Result<Vec<Item>, ResourceError>;

  /// Items that currently exist.
  async fn actual(&self, cancel: &CancellationToken) -> Result<Vec<Item>, ResourceError>;

  /// Converge a single reconciled item.
  async fn apply(&self, cancel: &CancellationToken, item: &Item) -> Result<ApplyOutcome, ResourceError>;
}

pub(crate) fn already_managed(item: &Item) -> ApplyOutcome {
  ApplyOutcome::Skipped(format!("{} is already managed", item.name))
}
