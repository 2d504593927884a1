//! Package manager adapters.
//!
//! Every external package manager is wrapped in a [`PackageManager`]. A few
//! managers have compiled adapters (`brew`, `npm`, `cargo`); everything else,
//! including managers declared in user configuration, is served by
//! [`GenericManager`] from a [`ManagerConfig`](crate::types::ManagerConfig).
//!
//! All adapters share the idempotency rules in [`classify`]: installing
//! something already installed and uninstalling something already absent
//! both succeed.

pub mod brew;
pub mod cargo;
pub mod classify;
pub mod defaults;
pub mod executor;
pub mod extract;
pub mod generic;
pub mod npm;
pub mod parse;
pub mod registry;
pub mod search;
mod tool;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub use executor::{CommandExecutor, CommandOutput, ExecError, SystemExecutor};
pub use generic::GenericManager;
pub use registry::{ManagerRegistry, RegistryError};
pub use search::{SearchResult, search_all};

use crate::types::Metadata;

/// Adapter operation, used for error context and pattern selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
  Available,
  List,
  Install,
  Uninstall,
  Upgrade,
  Search,
  Info,
}

impl Operation {
  pub fn as_str(&self) -> &'static str {
    match self {
      Operation::Available => "availability check",
      Operation::List => "list",
      Operation::Install => "install",
      Operation::Uninstall => "uninstall",
      Operation::Upgrade => "upgrade",
      Operation::Search => "search",
      Operation::Info => "info",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Details about a single package.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackageInfo {
  pub name: String,
  pub manager: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub homepage: Option<String>,
  pub installed: bool,
  #[serde(skip_serializing_if = "Metadata::is_empty")]
  pub metadata: Metadata,
}

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
  #[error("package manager '{manager}' is not available")]
  Unavailable { manager: String },

  #[error("package '{package}' not found in {manager}")]
  PackageNotFound { manager: String, package: String },

  #[error("permission denied during {manager} {operation} of '{package}': {output}")]
  PermissionDenied {
    manager: String,
    operation: Operation,
    package: String,
    output: String,
  },

  #[error("{manager} {operation} of '{package}' failed (exit code {code:?}): {output}")]
  CommandFailed {
    manager: String,
    operation: Operation,
    package: String,
    code: Option<i32>,
    output: String,
  },

  #[error("failed to parse {manager} {operation} output: {reason}")]
  Parse {
    manager: String,
    operation: Operation,
    reason: String,
  },

  #[error("{manager} does not support {operation}")]
  Unsupported { manager: String, operation: Operation },

  #[error("{manager} {operation} timed out after {timeout:?}")]
  Timeout {
    manager: String,
    operation: Operation,
    timeout: Duration,
  },

  #[error("{manager} {operation} was cancelled")]
  Cancelled { manager: String, operation: Operation },

  #[error("failed to run {manager} {operation}: {source}")]
  Exec {
    manager: String,
    operation: Operation,
    #[source]
    source: ExecError,
  },
}

impl ManagerError {
  /// Wrap an executor failure, keeping cancellation distinguishable.
  pub fn from_exec(manager: &str, operation: Operation, err: ExecError) -> Self {
    if err.is_cancelled() {
      ManagerError::Cancelled {
        manager: manager.to_string(),
        operation,
      }
    } else {
      ManagerError::Exec {
        manager: manager.to_string(),
        operation,
        source: err,
      }
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, ManagerError::Cancelled { .. })
  }

  pub fn is_unavailable(&self) -> bool {
    matches!(self, ManagerError::Unavailable { .. })
  }
}

/// Uniform contract over one external package manager.
#[async_trait]
pub trait PackageManager: Send + Sync {
  /// Registry name of this manager.
  fn name(&self) -> &str;

  /// `Ok(false)` means the tool is not installed, which is not an error.
  async fn is_available(&self, cancel: &CancellationToken) -> Result<bool, ManagerError>;

  async fn list_installed(&self, cancel: &CancellationToken) -> Result<Vec<String>, ManagerError>;

  /// Install `name`. Already installed counts as success.
  async fn install(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError>;

  /// Uninstall `name`. Already absent counts as success.
  async fn uninstall(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError>;

  /// Upgrade `names`, or everything when `names` is empty and the manager supports it.
  async fn upgrade(&self, cancel: &CancellationToken, names: &[String]) -> Result<(), ManagerError>;

  /// Search for packages. An empty result is not an error.
  async fn search(&self, cancel: &CancellationToken, query: &str) -> Result<Vec<String>, ManagerError>;

  async fn info(&self, cancel: &CancellationToken, name: &str) -> Result<PackageInfo, ManagerError>;

  async fn is_installed(&self, cancel: &CancellationToken, name: &str) -> Result<bool, ManagerError> {
    Ok(self.list_installed(cancel).await?.iter().any(|p| p == name))
  }

  async fn installed_version(&self, _cancel: &CancellationToken, _name: &str) -> Result<Option<String>, ManagerError> {
    Ok(None)
  }

  /// Extra metadata derived from a package name.
  fn metadata_for(&self, _name: &str) -> Metadata {
    Metadata::new()
  }
}

/// Fail with [`ManagerError::Unavailable`] unless the manager reports itself available.
pub async fn ensure_available(manager: &dyn PackageManager, cancel: &CancellationToken) -> Result<(), ManagerError> {
  if manager.is_available(cancel).await? {
    Ok(())
  } else {
    Err(ManagerError::Unavailable {
      manager: manager.name().to_string(),
    })
  }
}

/// A parsed `manager:name` package reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
  pub manager: String,
  pub name: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid package spec '{0}'")]
pub struct InvalidPackageSpec(pub String);

impl PackageSpec {
  /// Parse `manager:name` or a bare `name` owned by `default_manager`.
  ///
  /// Only the first `:` separates manager and name.
  pub fn parse(spec: &str, default_manager: &str) -> Result<Self, InvalidPackageSpec> {
    let spec = spec.trim();
    let (manager, name) = match spec.split_once(':') {
      Some((manager, name)) => (manager.trim(), name.trim()),
      None => (default_manager, spec),
    };
    if manager.is_empty() || name.is_empty() {
      return Err(InvalidPackageSpec(spec.to_string()));
    }
    Ok(Self {
      manager: manager.to_string(),
      name: name.to_string(),
    })
  }
}

impl fmt::Display for PackageSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.manager, self.name)
  }
}
