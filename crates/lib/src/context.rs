//! Everything a command needs, resolved once at startup.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::{Config, ConfigError};
use crate::lock::{LockError, LockStore};
use crate::managers::{CommandExecutor, InvalidPackageSpec, ManagerRegistry, PackageSpec, RegistryError};
use crate::orchestrator::{Orchestrator, ShellHookRunner};
use crate::platform::{PathError, config_dir, home_dir};
use crate::resource::{DotfileResource, PackageResource, ResourceError};

#[derive(Debug, Error)]
pub enum ContextError {
  #[error(transparent)]
  Path(#[from] PathError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error(transparent)]
  Resource(#[from] ResourceError),
}

#[derive(Debug)]
pub struct Context {
  pub config: Config,
  pub config_dir: PathBuf,
  pub home_dir: PathBuf,
  pub registry: Arc<ManagerRegistry>,
  pub lock: LockStore,
  exec: Arc<dyn CommandExecutor>,
}

impl Context {
  /// Resolve directories from the environment and load the config found there.
  pub fn load(exec: Arc<dyn CommandExecutor>) -> Result<Self, ContextError> {
    let config_dir = config_dir()?;
    let home_dir = home_dir()?;
    let config = Config::load(&config_dir)?;
    Self::new(config, config_dir, home_dir, exec)
  }

  pub fn new(
    config: Config,
    config_dir: PathBuf,
    home_dir: PathBuf,
    exec: Arc<dyn CommandExecutor>,
  ) -> Result<Self, ContextError> {
    let registry = ManagerRegistry::new(exec.clone(), &config.managers)?;
    registry.validate(&config.default_manager)?;
    debug!(
      config_dir = %config_dir.display(),
      home_dir = %home_dir.display(),
      managers = ?registry.names(),
      "context ready"
    );
    Ok(Self {
      lock: LockStore::in_dir(&config_dir),
      config,
      config_dir,
      home_dir,
      registry: Arc::new(registry),
      exec,
    })
  }

  /// Orchestrator over the package and dotfile resources, with desired
  /// packages taken from the current lock file.
  pub fn orchestrator(&self) -> Result<Orchestrator, ContextError> {
    let lock = self.lock.load()?;
    let packages = PackageResource::from_lock(self.registry.clone(), &lock, self.config.package_timeout());
    let dotfiles = DotfileResource::new(
      &self.config_dir,
      &self.home_dir,
      &self.config.ignore_patterns,
      self.config.dotfile_timeout(),
    )?;
    let runner = Arc::new(ShellHookRunner::new(self.exec.clone()));
    Ok(
      Orchestrator::new(self.lock.clone(), self.config.hooks.clone(), runner)
        .with_resource(Box::new(packages))
        .with_resource(Box::new(dotfiles)),
    )
  }

  /// Parse `manager:name`, defaulting to the configured manager.
  pub fn parse_spec(&self, spec: &str) -> Result<PackageSpec, InvalidPackageSpec> {
    PackageSpec::parse(spec, &self.config.default_manager)
  }
}
