//! User configuration read from `plonk.yaml`.
//!
//! Every field is optional. A missing file yields the defaults; unknown keys
//! are rejected so typos surface at startup instead of being ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glob::Pattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::CONFIG_FILENAME;
use crate::managers::defaults::default_configs;
use crate::orchestrator::HooksConfig;
use crate::resource::dotfiles::DEFAULT_IGNORE_PATTERNS;
use crate::types::{ManagerConfig, ManagerConfigError};

pub const DEFAULT_MANAGER: &str = "brew";
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_PACKAGE_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_DOTFILE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("default manager '{0}' is not a known package manager")]
  UnknownDefaultManager(String),

  #[error("invalid configuration for manager '{manager}': {source}")]
  Manager {
    manager: String,
    #[source]
    source: ManagerConfigError,
  },

  #[error("invalid ignore pattern '{pattern}': {source}")]
  IgnorePattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("{field} must be greater than zero")]
  ZeroTimeout { field: &'static str },

  #[error("hook command must not be empty")]
  EmptyHook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub default_manager: String,
  /// Seconds allowed for each manager during search.
  pub operation_timeout: u64,
  /// Seconds allowed for each adapter call while applying a package.
  pub package_timeout: u64,
  /// Seconds allowed for deploying one dotfile.
  pub dotfile_timeout: u64,
  pub ignore_patterns: Vec<String>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub managers: BTreeMap<String, ManagerConfig>,
  pub hooks: HooksConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      default_manager: DEFAULT_MANAGER.to_string(),
      operation_timeout: DEFAULT_OPERATION_TIMEOUT_SECS,
      package_timeout: DEFAULT_PACKAGE_TIMEOUT_SECS,
      dotfile_timeout: DEFAULT_DOTFILE_TIMEOUT_SECS,
      ignore_patterns: DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect(),
      managers: BTreeMap::new(),
      hooks: HooksConfig::default(),
    }
  }
}

impl Config {
  /// Load and validate `plonk.yaml` from `dir`.
  pub fn load(dir: &Path) -> Result<Self, ConfigError> {
    let path = dir.join(CONFIG_FILENAME);
    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Self::default());
      }
      Err(source) => return Err(ConfigError::Read { path, source }),
    };
    let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
      path: path.clone(),
      source,
    })?;
    config.validate()?;
    debug!(path = %path.display(), managers = config.managers.len(), "loaded config");
    Ok(config)
  }

  /// Parse YAML without validating it. An empty document is the default config.
  pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
    if content.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(content)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    for (field, value) in [
      ("operation_timeout", self.operation_timeout),
      ("package_timeout", self.package_timeout),
      ("dotfile_timeout", self.dotfile_timeout),
    ] {
      if value == 0 {
        return Err(ConfigError::ZeroTimeout { field });
      }
    }

    for pattern in &self.ignore_patterns {
      Pattern::new(pattern).map_err(|source| ConfigError::IgnorePattern {
        pattern: pattern.clone(),
        source,
      })?;
    }

    let builtins = default_configs();
    for (name, config) in &self.managers {
      let effective = match builtins.get(name) {
        Some(base) => base.merge(config),
        None => config.clone(),
      };
      effective.validate(name).map_err(|source| ConfigError::Manager {
        manager: name.clone(),
        source,
      })?;
    }

    if !builtins.contains_key(&self.default_manager) && !self.managers.contains_key(&self.default_manager) {
      return Err(ConfigError::UnknownDefaultManager(self.default_manager.clone()));
    }

    if self
      .hooks
      .pre_apply
      .iter()
      .chain(&self.hooks.post_apply)
      .any(|h| h.command.trim().is_empty())
    {
      return Err(ConfigError::EmptyHook);
    }
    Ok(())
  }

  pub fn operation_timeout(&self) -> Duration {
    Duration::from_secs(self.operation_timeout)
  }

  pub fn package_timeout(&self) -> Duration {
    Duration::from_secs(self.package_timeout)
  }

  pub fn dotfile_timeout(&self) -> Duration {
    Duration::from_secs(self.dotfile_timeout)
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load(dir.path()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.default_manager, "brew");
    assert_eq!(config.package_timeout(), Duration::from_secs(180));
    assert!(config.ignore_patterns.iter().any(|p| p == ".DS_Store"));
  }

  #[test]
  fn partial_file_keeps_other_defaults() {
    let config = Config::parse("default_manager: cargo\ndotfile_timeout: 5\n").unwrap();
    config.validate().unwrap();
    assert_eq!(config.default_manager, "cargo");
    assert_eq!(config.dotfile_timeout(), Duration::from_secs(5));
    assert_eq!(config.operation_timeout, DEFAULT_OPERATION_TIMEOUT_SECS);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    assert!(Config::parse("default_manger: brew\n").is_err());
  }

  #[test]
  fn empty_document_is_default() {
    assert_eq!(Config::parse("\n").unwrap(), Config::default());
  }

  #[test]
  fn full_file() {
    let yaml = r#"
default_manager: apt
managers:
  apt:
    binary: apt-get
    list:
      command: [dpkg-query, -W, -f, "${Package}\n"]
    install:
      command: [sudo, apt-get, install, -y, "{{Package}}"]
    uninstall:
      command: [sudo, apt-get, remove, -y, "{{Package}}"]
hooks:
  pre_apply:
    - command: echo starting
      timeout: 30s
  post_apply:
    - command: notify-send done
      continue_on_error: true
"#;
    let config = Config::parse(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.managers["apt"].binary, "apt-get");
    assert_eq!(config.hooks.pre_apply[0].timeout, Duration::from_secs(30));
    assert!(config.hooks.post_apply[0].continue_on_error);
  }

  #[test]
  fn override_of_builtin_is_validated_after_merge() {
    let config = Config::parse("managers:\n  pipx:\n    install_hint: use your distro\n").unwrap();
    config.validate().unwrap();
  }

  #[test]
  fn incomplete_new_manager_is_rejected() {
    let config = Config::parse("managers:\n  apt:\n    binary: apt-get\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::Manager { ref manager, .. } if manager == "apt"), "{err}");
  }

  #[test]
  fn unknown_default_manager_is_rejected() {
    let config = Config::parse("default_manager: zypper\n").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::UnknownDefaultManager(_))));
  }

  #[test]
  fn bad_values_are_rejected() {
    let zero = Config::parse("package_timeout: 0\n").unwrap();
    assert!(matches!(zero.validate(), Err(ConfigError::ZeroTimeout { field: "package_timeout" })));

    let pattern = Config::parse("ignore_patterns: [\"[\"]\n").unwrap();
    assert!(matches!(pattern.validate(), Err(ConfigError::IgnorePattern { .. })));

    let hook = Config::parse("hooks:\n  pre_apply:\n    - command: \" \"\n").unwrap();
    assert!(matches!(hook.validate(), Err(ConfigError::EmptyHook)));
  }

  #[test]
  fn invalid_file_reports_path() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILENAME), "default_manager: [").unwrap();
    let err = Config::load(dir.path()).unwrap_err();
    assert!(err.to_string().contains(CONFIG_FILENAME));
  }
}
