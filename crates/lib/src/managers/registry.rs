//! Name → adapter registry.
//!
//! Built once at startup from the injected executor and the user's manager
//! configuration, so every later lookup is against a validated, closed set.
//!
//! Resolution order for a name:
//! 1. a user configuration entry, merged onto the built-in one when it exists,
//!    served by [`GenericManager`]
//! 2. a compiled adapter (`brew`, `npm`, `cargo`)
//! 3. a built-in configuration served by [`GenericManager`]

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::brew::{self, BrewManager};
use super::cargo::{self, CargoManager};
use super::defaults::default_configs;
use super::npm::{self, NpmManager};
use super::{CommandExecutor, GenericManager, ManagerError, PackageManager};
use crate::types::{ManagerConfig, ManagerConfigError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
  #[error("unsupported package manager: {0}")]
  Unsupported(String),

  #[error("invalid configuration for manager '{manager}': {source}")]
  InvalidConfig {
    manager: String,
    #[source]
    source: ManagerConfigError,
  },
}

#[derive(Clone)]
pub struct ManagerRegistry {
  managers: BTreeMap<String, Arc<dyn PackageManager>>,
  configs: BTreeMap<String, ManagerConfig>,
}

impl std::fmt::Debug for ManagerRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ManagerRegistry")
      .field("managers", &self.managers.keys().collect::<Vec<_>>())
      .finish()
  }
}

impl ManagerRegistry {
  /// Registry with only the built-in managers.
  pub fn with_defaults(exec: Arc<dyn CommandExecutor>) -> Self {
    let managers = default_configs()
      .into_iter()
      .filter_map(|(name, config)| {
        let manager = builtin(&name, config.clone(), exec.clone()).ok()?;
        Some((name, (manager, config)))
      })
      .collect::<BTreeMap<_, _>>();
    let (managers, configs) = split(managers);
    Self { managers, configs }
  }

  /// Registry with the built-ins plus `user` configuration.
  ///
  /// Every user entry is validated here; an invalid one fails construction.
  pub fn new(exec: Arc<dyn CommandExecutor>, user: &BTreeMap<String, ManagerConfig>) -> Result<Self, RegistryError> {
    let mut registry = Self::with_defaults(exec.clone());
    for (name, config) in user {
      let effective = match registry.configs.get(name) {
        Some(base) => base.merge(config),
        None => config.clone(),
      };
      let generic = GenericManager::new(name.as_str(), effective.clone(), exec.clone()).map_err(|source| {
        RegistryError::InvalidConfig {
          manager: name.clone(),
          source,
        }
      })?;
      debug!(manager = %name, "registered configured manager");
      registry.managers.insert(name.clone(), Arc::new(generic));
      registry.configs.insert(name.clone(), effective);
    }
    Ok(registry)
  }

  /// Replace or add the adapter for `name`.
  pub fn register(&mut self, name: impl Into<String>, manager: Arc<dyn PackageManager>) {
    self.managers.insert(name.into(), manager);
  }

  pub fn get(&self, name: &str) -> Result<Arc<dyn PackageManager>, RegistryError> {
    self
      .managers
      .get(name)
      .cloned()
      .ok_or_else(|| RegistryError::Unsupported(name.to_string()))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.managers.contains_key(name)
  }

  /// Fail unless `name` is a registered manager.
  pub fn validate(&self, name: &str) -> Result<(), RegistryError> {
    self.get(name).map(|_| ())
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<String> {
    self.managers.keys().cloned().collect()
  }

  /// Effective configuration for `name`, when it has one.
  pub fn config(&self, name: &str) -> Option<&ManagerConfig> {
    self.configs.get(name)
  }

  /// Names of managers whose tool is present on this machine.
  ///
  /// Probe errors other than cancellation count as unavailable.
  pub async fn available_managers(&self, cancel: &CancellationToken) -> Result<Vec<String>, ManagerError> {
    let mut available = Vec::new();
    for (name, manager) in &self.managers {
      match manager.is_available(cancel).await {
        Ok(true) => available.push(name.clone()),
        Ok(false) => {}
        Err(err) if err.is_cancelled() => return Err(err),
        Err(err) => debug!(manager = %name, error = %err, "availability check failed"),
      }
    }
    Ok(available)
  }
}

fn builtin(
  name: &str,
  config: ManagerConfig,
  exec: Arc<dyn CommandExecutor>,
) -> Result<Arc<dyn PackageManager>, ManagerConfigError> {
  Ok(match name {
    brew::NAME => Arc::new(BrewManager::new(exec)),
    npm::NAME => Arc::new(NpmManager::new(exec)),
    cargo::NAME => Arc::new(CargoManager::new(exec)),
    _ => Arc::new(GenericManager::new(name, config, exec)?),
  })
}

type Entries = BTreeMap<String, (Arc<dyn PackageManager>, ManagerConfig)>;

fn split(entries: Entries) -> (BTreeMap<String, Arc<dyn PackageManager>>, BTreeMap<String, ManagerConfig>) {
  let mut managers = BTreeMap::new();
  let mut configs = BTreeMap::new();
  for (name, (manager, config)) in entries {
    managers.insert(name.clone(), manager);
    configs.insert(name, config);
  }
  (managers, configs)
}
