//! The package domain: desired packages come from the lock, actual packages
//! from each manager's installed list.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ApplyOutcome, Resource, ResourceError, already_managed};
use crate::lock::{LockRecord, ResourceEntry};
use crate::managers::{ManagerError, ManagerRegistry, PackageManager};
use crate::types::{Domain, Item, ItemState, package_key};

pub const RESOURCE_ID: &str = "packages";

pub struct PackageResource {
  registry: Arc<ManagerRegistry>,
  desired: Vec<Item>,
  timeout: Duration,
  /// Availability per manager, probed at most once per resource.
  availability: Mutex<HashMap<String, bool>>,
}

impl PackageResource {
  pub fn new(registry: Arc<ManagerRegistry>, desired: Vec<Item>, timeout: Duration) -> Self {
    Self {
      registry,
      desired,
      timeout,
      availability: Mutex::new(HashMap::new()),
    }
  }

  /// Desired packages are whatever the lock records.
  pub fn from_lock(registry: Arc<ManagerRegistry>, lock: &LockRecord, timeout: Duration) -> Self {
    Self::new(registry, lock.package_items(), timeout)
  }

  /// Managers owning at least one desired package, sorted.
  fn managers(&self) -> BTreeSet<String> {
    self.desired.iter().map(|i| i.manager.clone()).collect()
  }

  async fn bounded<T, F>(&self, item: &str, fut: F) -> Result<T, ResourceError>
  where
    F: Future<Output = Result<T, ManagerError>>,
  {
    match tokio::time::timeout(self.timeout, fut).await {
      Ok(result) => result.map_err(ResourceError::from),
      Err(_) => Err(ResourceError::Timeout {
        item: item.to_string(),
        timeout: self.timeout,
      }),
    }
  }

  async fn is_available(
    &self,
    cancel: &CancellationToken,
    name: &str,
    manager: &dyn PackageManager,
  ) -> Result<bool, ResourceError> {
    if let Some(known) = self.cached(name) {
      return Ok(known);
    }
    let available = match self.bounded(name, manager.is_available(cancel)).await {
      Ok(available) => available,
      Err(err) if err.is_cancelled() => return Err(err),
      Err(err) => {
        warn!(manager = %name, error = %err, "availability check failed");
        false
      }
    };
    if let Ok(mut cache) = self.availability.lock() {
      cache.insert(name.to_string(), available);
    }
    Ok(available)
  }

  fn cached(&self, name: &str) -> Option<bool> {
    self.availability.lock().ok()?.get(name).copied()
  }

  fn unavailable_reason(&self, name: &str) -> String {
    match self.registry.config(name).map(|c| c.install_hint.as_str()) {
      Some(hint) if !hint.is_empty() => format!("{} is not available ({})", name, hint),
      _ => format!("{} is not available", name),
    }
  }
}

#[async_trait]
impl Resource for PackageResource {
  fn id(&self) -> &str {
    RESOURCE_ID
  }

  fn domain(&self) -> Domain {
    Domain::Package
  }

  fn desired(&self) -> Result<Vec<Item>, ResourceError> {
    Ok(self.desired.clone())
  }

  async fn actual(&self, cancel: &CancellationToken) -> Result<Vec<Item>, ResourceError> {
    let mut items = Vec::new();
    for name in self.managers() {
      let manager = match self.registry.get(&name) {
        Ok(manager) => manager,
        Err(err) => {
          warn!(manager = %name, error = %err, "skipping unknown manager");
          continue;
        }
      };
      if !self.is_available(cancel, &name, manager.as_ref()).await? {
        debug!(manager = %name, "manager not available, nothing installed");
        continue;
      }
      match self.bounded(&name, manager.list_installed(cancel)).await {
        Ok(installed) => items.extend(installed.into_iter().map(|pkg| {
          let mut item = Item::package(name.as_str(), pkg.as_str()).with_state(ItemState::Untracked);
          item.metadata = manager.metadata_for(&pkg);
          item
        })),
        Err(err) if err.is_cancelled() => return Err(err),
        Err(err) => warn!(manager = %name, error = %err, "failed to list installed packages"),
      }
    }
    Ok(items)
  }

  async fn apply(&self, cancel: &CancellationToken, item: &Item) -> Result<ApplyOutcome, ResourceError> {
    if item.domain != Domain::Package {
      return Err(ResourceError::WrongDomain {
        item: item.name.clone(),
        domain: item.domain,
      });
    }
    let key = package_key(&item.manager, &item.name);
    let manager = self.registry.get(&item.manager)?;
    if !self.is_available(cancel, &item.manager, manager.as_ref()).await? {
      return Ok(ApplyOutcome::Skipped(self.unavailable_reason(&item.manager)));
    }

    match item.state {
      ItemState::Missing | ItemState::Degraded => {
        self.bounded(&key, manager.install(cancel, &item.name)).await?;
        let version = match self.bounded(&key, manager.installed_version(cancel, &item.name)).await {
          Ok(version) => version.unwrap_or_default(),
          Err(err) if err.is_cancelled() => return Err(err),
          Err(err) => {
            debug!(package = %key, error = %err, "could not read installed version");
            String::new()
          }
        };
        let entry = ResourceEntry::package(&item.manager, &item.name, &version, Some(Utc::now()));
        Ok(if item.state == ItemState::Missing {
          ApplyOutcome::Added(entry)
        } else {
          ApplyOutcome::Updated(entry)
        })
      }
      ItemState::Untracked => {
        self.bounded(&key, manager.uninstall(cancel, &item.name)).await?;
        Ok(ApplyOutcome::Removed(key))
      }
      ItemState::Managed => Ok(already_managed(item)),
    }
  }
}
