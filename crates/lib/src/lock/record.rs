use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LockError;
use crate::types::{Item, META_DESTINATION, META_MANAGER, META_NAME, META_SOURCE, META_VERSION, Metadata, package_key};

/// Current lock file format version.
pub const LOCK_VERSION: u32 = 2;

/// The package-only format that version 2 replaced.
pub const LEGACY_LOCK_VERSION: u32 = 1;

pub const RESOURCE_PACKAGE: &str = "package";
pub const RESOURCE_DOTFILE: &str = "dotfile";

/// State recorded for every resource plonk manages.
pub const RESOURCE_STATE_MANAGED: &str = "managed";

/// The persisted record of managed items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
  pub version: u32,
  /// Legacy per-manager package lists. Folded into `resources` on write.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub packages: BTreeMap<String, Vec<PackageEntry>>,
  #[serde(default)]
  pub resources: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageEntry {
  pub name: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub installed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
  #[serde(rename = "type")]
  pub type_: String,
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub state: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub installed_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub metadata: Metadata,
}

/// On-disk shape of a version 1 lock file.
#[derive(Debug, Deserialize)]
pub(super) struct LockFileV1 {
  #[serde(default)]
  pub packages: BTreeMap<String, Vec<PackageEntry>>,
}

impl LockFileV1 {
  pub(super) fn into_record(self) -> LockRecord {
    LockRecord {
      version: LEGACY_LOCK_VERSION,
      packages: self.packages,
      resources: Vec::new(),
    }
  }
}

impl Default for LockRecord {
  fn default() -> Self {
    Self::new()
  }
}

impl ResourceEntry {
  /// A package resource with id `manager:name`.
  pub fn package(manager: &str, name: &str, version: &str, installed_at: Option<DateTime<Utc>>) -> Self {
    let mut metadata = Metadata::new();
    metadata.insert(META_MANAGER.to_string(), manager.into());
    metadata.insert(META_NAME.to_string(), name.into());
    metadata.insert(META_VERSION.to_string(), version.into());
    Self {
      type_: RESOURCE_PACKAGE.to_string(),
      id: package_key(manager, name),
      name: name.to_string(),
      state: RESOURCE_STATE_MANAGED.to_string(),
      installed_at,
      metadata,
    }
  }

  /// A dotfile resource keyed by its destination path.
  pub fn dotfile(name: &str, source: &str, destination: &str) -> Self {
    let mut metadata = Metadata::new();
    metadata.insert(META_SOURCE.to_string(), source.into());
    metadata.insert(META_DESTINATION.to_string(), destination.into());
    Self {
      type_: RESOURCE_DOTFILE.to_string(),
      id: destination.to_string(),
      name: name.to_string(),
      state: RESOURCE_STATE_MANAGED.to_string(),
      installed_at: Some(Utc::now()),
      metadata,
    }
  }

  pub fn is_package(&self) -> bool {
    self.type_ == RESOURCE_PACKAGE
  }

  fn meta_str(&self, key: &str) -> Option<&str> {
    self.metadata.get(key).and_then(|v| v.as_str())
  }

  /// Manager and name of a package resource.
  ///
  /// Prefers metadata and falls back to splitting the id.
  pub fn package_parts(&self) -> Option<(&str, &str)> {
    if !self.is_package() {
      return None;
    }
    if let (Some(manager), Some(name)) = (self.meta_str(META_MANAGER), self.meta_str(META_NAME)) {
      return Some((manager, name));
    }
    let (manager, name) = self.id.split_once(':')?;
    Some((manager, if self.name.is_empty() { name } else { self.name.as_str() }))
  }
}

impl LockRecord {
  /// Create a new empty record in the current format.
  pub fn new() -> Self {
    Self {
      version: LOCK_VERSION,
      packages: BTreeMap::new(),
      resources: Vec::new(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.resources.is_empty() && self.packages.values().all(Vec::is_empty)
  }

  /// Convert to the current format in place.
  ///
  /// Every legacy package entry becomes a `package` resource. A resource that
  /// already carries the same id wins over the legacy entry. Returns the
  /// version the record had before, or `None` if it was already current and
  /// had no legacy entries.
  pub fn migrate(&mut self) -> Result<Option<u32>, LockError> {
    if self.version == LOCK_VERSION && self.packages.is_empty() {
      return Ok(None);
    }
    if self.version != LOCK_VERSION && self.version != LEGACY_LOCK_VERSION {
      return Err(LockError::UnsupportedVersion(self.version));
    }

    let mut ids: HashSet<String> = self.resources.iter().map(|r| r.id.clone()).collect();
    let mut converted = Vec::new();
    for (manager, entries) in &self.packages {
      if manager.trim().is_empty() {
        return Err(LockError::Migration {
          manager: manager.clone(),
          reason: "empty manager name".to_string(),
        });
      }
      for entry in entries {
        if entry.name.trim().is_empty() {
          return Err(LockError::Migration {
            manager: manager.clone(),
            reason: "package entry without a name".to_string(),
          });
        }
        let resource = ResourceEntry::package(manager, &entry.name, &entry.version, entry.installed_at);
        if ids.insert(resource.id.clone()) {
          converted.push(resource);
        }
      }
    }

    let previous = self.version;
    self.resources.extend(converted);
    self.packages.clear();
    self.version = LOCK_VERSION;
    Ok(Some(previous))
  }

  /// Desired package items recorded in this lock, in file order.
  ///
  /// Works on records that have not been migrated yet.
  pub fn package_items(&self) -> Vec<Item> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for resource in &self.resources {
      if let Some((manager, name)) = resource.package_parts()
        && seen.insert(package_key(manager, name))
      {
        let mut item = Item::package(manager, name);
        if let Some(version) = resource.meta_str(META_VERSION)
          && !version.is_empty()
        {
          item = item.with_metadata(META_VERSION, version);
        }
        items.push(item);
      }
    }
    for (manager, entries) in &self.packages {
      for entry in entries {
        if seen.insert(package_key(manager, &entry.name)) {
          let mut item = Item::package(manager.as_str(), entry.name.as_str());
          if !entry.version.is_empty() {
            item = item.with_metadata(META_VERSION, entry.version.as_str());
          }
          items.push(item);
        }
      }
    }
    items
  }

  pub fn has_package(&self, manager: &str, name: &str) -> bool {
    let id = package_key(manager, name);
    self.resources.iter().any(|r| r.id == id)
      || self
        .packages
        .get(manager)
        .is_some_and(|entries| entries.iter().any(|e| e.name == name))
  }

  /// Insert `entry`, replacing any resource with the same id.
  pub fn upsert_resource(&mut self, entry: ResourceEntry) {
    match self.resources.iter_mut().find(|r| r.id == entry.id) {
      Some(existing) => *existing = entry,
      None => self.resources.push(entry),
    }
  }

  /// Remove the resource with `id`, including a matching legacy package entry.
  ///
  /// Returns true if anything was removed.
  pub fn remove_resource(&mut self, id: &str) -> bool {
    let before = self.resources.len();
    self.resources.retain(|r| r.id != id);
    let mut removed = self.resources.len() != before;

    if let Some((manager, name)) = id.split_once(':')
      && let Some(entries) = self.packages.get_mut(manager)
    {
      let before = entries.len();
      entries.retain(|e| e.name != name);
      removed |= entries.len() != before;
      if entries.is_empty() {
        self.packages.remove(manager);
      }
    }
    removed
  }

  /// Record a package as managed, stamping the install time.
  pub fn add_package(&mut self, manager: &str, name: &str, version: &str) {
    self.upsert_resource(ResourceEntry::package(manager, name, version, Some(Utc::now())));
  }

  pub fn remove_package(&mut self, manager: &str, name: &str) -> bool {
    self.remove_resource(&package_key(manager, name))
  }
}
