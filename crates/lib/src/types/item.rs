use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Open attribute map attached to an item (version, source path, destination path, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

pub const META_MANAGER: &str = "manager";
pub const META_NAME: &str = "name";
pub const META_VERSION: &str = "version";
pub const META_SOURCE: &str = "source";
pub const META_DESTINATION: &str = "destination";
pub const META_DRIFT_STATUS: &str = "drift_status";

/// Value stored under [`META_DRIFT_STATUS`] when a comparator reports a difference.
pub const DRIFT_MODIFIED: &str = "modified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
  Package,
  Dotfile,
}

impl Domain {
  pub fn as_str(&self) -> &'static str {
    match self {
      Domain::Package => "package",
      Domain::Dotfile => "dotfile",
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
  /// Desired and present.
  Managed,
  /// Desired but not present.
  Missing,
  /// Present but not desired.
  Untracked,
  /// Desired and present, but drifted from the desired content.
  Degraded,
}

impl ItemState {
  pub fn as_str(&self) -> &'static str {
    match self {
      ItemState::Managed => "managed",
      ItemState::Missing => "missing",
      ItemState::Untracked => "untracked",
      ItemState::Degraded => "degraded",
    }
  }

  /// Whether an apply pass has anything to do for an item in this state.
  pub fn needs_action(&self) -> bool {
    !matches!(self, ItemState::Managed)
  }
}

impl fmt::Display for ItemState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Failure while checking an item for drift.
#[derive(Debug, thiserror::Error)]
pub enum DriftError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Typed drift check attached to an item.
///
/// Resources attach a comparator to the desired items they produce. The
/// reconciler calls it only for items present on both sides.
pub trait DriftComparator: Send + Sync + fmt::Debug {
  /// Returns `Ok(true)` when desired and actual are identical.
  fn compare(&self) -> Result<bool, DriftError>;
}

/// One unit of reconciliation: a package or a dotfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
  pub name: String,
  pub domain: Domain,
  /// Owning adapter; empty for dotfiles.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub manager: String,
  pub state: ItemState,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub metadata: Metadata,
  #[serde(skip)]
  pub comparator: Option<Arc<dyn DriftComparator>>,
}

impl PartialEq for Item {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
      && self.domain == other.domain
      && self.manager == other.manager
      && self.state == other.state
      && self.metadata == other.metadata
  }
}

impl Item {
  /// A package item owned by `manager`, initially `Missing`.
  pub fn package(manager: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      domain: Domain::Package,
      manager: manager.into(),
      state: ItemState::Missing,
      metadata: Metadata::new(),
      comparator: None,
    }
  }

  /// A dotfile item keyed by its destination path, initially `Missing`.
  pub fn dotfile(name: impl Into<String>, destination: impl Into<String>) -> Self {
    let mut metadata = Metadata::new();
    metadata.insert(META_DESTINATION.to_string(), serde_json::Value::String(destination.into()));
    Self {
      name: name.into(),
      domain: Domain::Dotfile,
      manager: String::new(),
      state: ItemState::Missing,
      metadata,
      comparator: None,
    }
  }

  pub fn with_state(mut self, state: ItemState) -> Self {
    self.state = state;
    self
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.metadata.insert(key.into(), value.into());
    self
  }

  pub fn with_comparator(mut self, comparator: Arc<dyn DriftComparator>) -> Self {
    self.comparator = Some(comparator);
    self
  }

  /// String metadata value, if present and a string.
  pub fn meta_str(&self, key: &str) -> Option<&str> {
    self.metadata.get(key).and_then(|v| v.as_str())
  }

  /// Reconciliation key for this item.
  ///
  /// Packages are keyed by `manager:name`, dotfiles by destination path
  /// (falling back to the name when no destination is recorded).
  pub fn key(&self) -> String {
    match self.domain {
      Domain::Package => package_key(&self.manager, &self.name),
      Domain::Dotfile => self.meta_str(META_DESTINATION).unwrap_or(&self.name).to_string(),
    }
  }
}

/// Key shared by package items and package lock entries.
pub fn package_key(manager: &str, name: &str) -> String {
  format!("{}:{}", manager, name)
}
