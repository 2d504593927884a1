//! Config-driven package manager adapter.
//!
//! A [`GenericManager`] knows nothing about any particular tool. Commands,
//! list parsing, idempotent error text and metadata rules all come from a
//! [`ManagerConfig`], so adding a manager is a configuration change.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::classify::ErrorMatcher;
use super::extract::MetadataExtractors;
use super::parse::ListParser;
use super::tool::Tool;
use super::{CommandExecutor, ManagerError, Operation, PackageInfo, PackageManager};
use crate::types::{ManagerConfig, ManagerConfigError, Metadata, render_command};

#[derive(Debug)]
pub struct GenericManager {
  config: ManagerConfig,
  parser: ListParser,
  extractors: MetadataExtractors,
  tool: Tool,
}

impl GenericManager {
  /// Build an adapter for `name`, validating `config` first.
  pub fn new(
    name: impl Into<String>,
    config: ManagerConfig,
    exec: Arc<dyn CommandExecutor>,
  ) -> Result<Self, ManagerConfigError> {
    let name = name.into();
    config.validate(&name)?;
    let parser = ListParser::from_config(&name, &config.list)?;
    let extractors = MetadataExtractors::from_config(&name, &config.metadata_extractors)?;
    let matcher = ErrorMatcher::new()
      .idempotent(Operation::Install, &config.install.idempotent_errors)
      .idempotent(Operation::Uninstall, &config.uninstall.idempotent_errors)
      .idempotent(Operation::Upgrade, &config.upgrade.idempotent_errors)
      .idempotent(Operation::Upgrade, &config.upgrade_all.idempotent_errors);
    let tool = Tool::new(&name, &config.binary, exec, matcher);
    Ok(Self {
      config,
      parser,
      extractors,
      tool,
    })
  }

  pub fn config(&self) -> &ManagerConfig {
    &self.config
  }

  fn render(&self, operation: Operation, template: &[String], package: &str) -> Result<Vec<String>, ManagerError> {
    let (program, mut args) = render_command(template, package).ok_or_else(|| ManagerError::Unsupported {
      manager: self.tool.manager.clone(),
      operation,
    })?;
    args.insert(0, program);
    Ok(args)
  }

  async fn mutate(
    &self,
    cancel: &CancellationToken,
    operation: Operation,
    template: &[String],
    package: &str,
  ) -> Result<(), ManagerError> {
    let argv = self.render(operation, template, package)?;
    self.tool.mutate(cancel, operation, package, &argv).await
  }
}

#[async_trait]
impl PackageManager for GenericManager {
  fn name(&self) -> &str {
    &self.tool.manager
  }

  async fn is_available(&self, cancel: &CancellationToken) -> Result<bool, ManagerError> {
    if !self.tool.on_path() {
      debug!(manager = %self.tool.manager, binary = %self.config.binary, "binary not on PATH");
      return Ok(false);
    }
    let Some(probe) = self.config.available.as_ref().filter(|c| !c.is_empty()) else {
      return Ok(true);
    };
    match self.tool.run(cancel, Operation::Available, &probe.command).await {
      Ok(output) => Ok(output.success()),
      Err(err @ ManagerError::Cancelled { .. }) => Err(err),
      Err(err) => {
        debug!(manager = %self.tool.manager, error = %err, "availability probe failed");
        Ok(false)
      }
    }
  }

  async fn list_installed(&self, cancel: &CancellationToken) -> Result<Vec<String>, ManagerError> {
    let output = self.tool.run(cancel, Operation::List, &self.config.list.command).await?;
    // Some tools exit non-zero on warnings but still print the listing.
    if !output.success() && output.stdout.trim().is_empty() {
      return Err(self.tool.failure(Operation::List, "", &output));
    }
    self.parser.parse(&self.tool.manager, &output.stdout)
  }

  async fn install(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError> {
    self.mutate(cancel, Operation::Install, &self.config.install.command, name).await?;
    info!(manager = %self.tool.manager, package = name, "installed package");
    Ok(())
  }

  async fn uninstall(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError> {
    self
      .mutate(cancel, Operation::Uninstall, &self.config.uninstall.command, name)
      .await?;
    info!(manager = %self.tool.manager, package = name, "uninstalled package");
    Ok(())
  }

  async fn upgrade(&self, cancel: &CancellationToken, names: &[String]) -> Result<(), ManagerError> {
    if names.is_empty() {
      if self.config.upgrade_all.is_empty() {
        return Err(ManagerError::Unsupported {
          manager: self.tool.manager.clone(),
          operation: Operation::Upgrade,
        });
      }
      return self
        .mutate(cancel, Operation::Upgrade, &self.config.upgrade_all.command, "")
        .await;
    }

    if self.config.upgrade.is_empty() {
      return Err(ManagerError::Unsupported {
        manager: self.tool.manager.clone(),
        operation: Operation::Upgrade,
      });
    }

    let mut first_error = None;
    for name in names {
      match self.mutate(cancel, Operation::Upgrade, &self.config.upgrade.command, name).await {
        Ok(()) => {}
        Err(err) if err.is_cancelled() => return Err(err),
        Err(err) => {
          warn!(manager = %self.tool.manager, package = %name, error = %err, "upgrade failed");
          first_error.get_or_insert(err);
        }
      }
    }
    first_error.map_or(Ok(()), Err)
  }

  async fn search(&self, _cancel: &CancellationToken, _query: &str) -> Result<Vec<String>, ManagerError> {
    Ok(Vec::new())
  }

  async fn info(&self, cancel: &CancellationToken, name: &str) -> Result<PackageInfo, ManagerError> {
    let installed = self.is_installed(cancel, name).await?;
    Ok(PackageInfo {
      name: name.to_string(),
      manager: self.tool.manager.clone(),
      description: (!self.config.description.is_empty()).then(|| self.config.description.clone()),
      installed,
      metadata: self.metadata_for(name),
      ..Default::default()
    })
  }

  fn metadata_for(&self, name: &str) -> Metadata {
    self.extractors.extract(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::managers::CommandOutput;
  use crate::managers::defaults::default_config;
  use crate::util::testutil::FakeExecutor;

  fn tool_config() -> ManagerConfig {
    serde_yaml::from_str(
      r#"
binary: tool
list:
  command: [tool, list]
install:
  command: [tool, add, "{{Package}}"]
  idempotent_errors: ["already present"]
uninstall:
  command: [tool, rm, "{{Package}}"]
  idempotent_errors: ["not present"]
upgrade:
  command: [tool, up, "{{Package}}"]
metadata_extractors:
  scope:
    pattern: "^(@[^/]+)/"
"#,
    )
    .unwrap()
  }

  fn manager(exec: FakeExecutor) -> (Arc<FakeExecutor>, GenericManager) {
    let exec = Arc::new(exec);
    let manager = GenericManager::new("tool", tool_config(), exec.clone()).unwrap();
    (exec, manager)
  }

  mod availability {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unavailable_not_error() {
      let (_, m) = manager(FakeExecutor::new());
      assert!(!m.is_available(&CancellationToken::new()).await.unwrap());
    }

    #[tokio::test]
    async fn binary_on_path_is_available() {
      let (_, m) = manager(FakeExecutor::new().with_binary("tool"));
      assert!(m.is_available(&CancellationToken::new()).await.unwrap());
    }

    #[tokio::test]
    async fn probe_command_decides() {
      let exec = Arc::new(FakeExecutor::new().with_binary("tool"));
      exec.respond("tool --version", CommandOutput::failed(1, "broken"));
      let mut config = tool_config();
      config.available = Some(crate::types::CommandConfig::new(["tool", "--version"]));
      let m = GenericManager::new("tool", config, exec).unwrap();
      assert!(!m.is_available(&CancellationToken::new()).await.unwrap());
    }

    #[tokio::test]
    async fn cancelled_probe_propagates() {
      let exec = Arc::new(FakeExecutor::new().with_binary("tool"));
      let mut config = tool_config();
      config.available = Some(crate::types::CommandConfig::new(["tool", "--version"]));
      let m = GenericManager::new("tool", config, exec).unwrap();
      let cancel = CancellationToken::new();
      cancel.cancel();
      assert!(m.is_available(&cancel).await.unwrap_err().is_cancelled());
    }
  }

  mod mutations {
    use super::*;

    #[tokio::test]
    async fn install_twice_succeeds_both_times() {
      let exec = FakeExecutor::new();
      exec.respond("tool add jq", CommandOutput::ok("added jq"));
      exec.respond("tool add jq", CommandOutput::failed(1, "jq is ALREADY PRESENT"));
      let (exec, m) = manager(exec);
      let cancel = CancellationToken::new();

      m.install(&cancel, "jq").await.unwrap();
      m.install(&cancel, "jq").await.unwrap();
      assert_eq!(exec.call_count("tool add jq"), 2);
    }

    #[tokio::test]
    async fn uninstall_absent_succeeds() {
      let exec = FakeExecutor::new();
      exec.respond("tool rm jq", CommandOutput::failed(1, "jq not present"));
      let (_, m) = manager(exec);
      m.uninstall(&CancellationToken::new(), "jq").await.unwrap();
    }

    #[tokio::test]
    async fn real_failure_carries_output() {
      let exec = FakeExecutor::new();
      exec.respond("tool add jq", CommandOutput::failed(4, "network unreachable"));
      let (_, m) = manager(exec);
      let err = m.install(&CancellationToken::new(), "jq").await.unwrap_err();
      assert!(matches!(err, ManagerError::CommandFailed { code: Some(4), ref output, .. } if output.contains("network")));
    }

    #[tokio::test]
    async fn upgrade_all_unconfigured_is_unsupported() {
      let (_, m) = manager(FakeExecutor::new());
      let err = m.upgrade(&CancellationToken::new(), &[]).await.unwrap_err();
      assert!(matches!(err, ManagerError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn upgrade_continues_past_failures() {
      let exec = FakeExecutor::new();
      exec.respond("tool up a", CommandOutput::failed(1, "boom"));
      exec.respond("tool up b", CommandOutput::ok(""));
      let (exec, m) = manager(exec);
      let names = vec!["a".to_string(), "b".to_string()];
      assert!(m.upgrade(&CancellationToken::new(), &names).await.is_err());
      assert_eq!(exec.call_count("tool up b"), 1);
    }

    #[tokio::test]
    async fn upgrade_all_drops_package_placeholder() {
      let exec = Arc::new(FakeExecutor::new());
      exec.respond("tool upall", CommandOutput::ok(""));
      let mut config = tool_config();
      config.upgrade_all = crate::types::CommandConfig::new(["tool", "upall", "{{Package}}"]);
      let m = GenericManager::new("tool", config, exec.clone()).unwrap();
      m.upgrade(&CancellationToken::new(), &[]).await.unwrap();
      assert_eq!(exec.calls(), vec!["tool upall"]);
    }
  }

  mod listing {
    use super::*;

    #[tokio::test]
    async fn list_parses_lines() {
      let exec = FakeExecutor::new();
      exec.respond("tool list", CommandOutput::ok("jq 1.7\nfd 9.0\n"));
      let (_, m) = manager(exec);
      let cancel = CancellationToken::new();
      assert_eq!(m.list_installed(&cancel).await.unwrap(), vec!["jq", "fd"]);
      assert!(m.is_installed(&cancel, "fd").await.unwrap());
    }

    #[tokio::test]
    async fn failed_list_without_output_is_an_error() {
      let exec = FakeExecutor::new();
      exec.respond("tool list", CommandOutput::failed(1, "corrupt state"));
      let (_, m) = manager(exec);
      assert!(m.list_installed(&CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn info_carries_extracted_metadata() {
      let exec = FakeExecutor::new();
      exec.respond("tool list", CommandOutput::ok("@vue/cli\n"));
      let (_, m) = manager(exec);
      let info = m.info(&CancellationToken::new(), "@vue/cli").await.unwrap();
      assert!(info.installed);
      assert_eq!(info.metadata["scope"], "@vue");
    }

    #[tokio::test]
    async fn search_is_empty() {
      let (_, m) = manager(FakeExecutor::new());
      assert!(m.search(&CancellationToken::new(), "jq").await.unwrap().is_empty());
    }
  }

  #[test]
  fn invalid_config_is_rejected() {
    let result = GenericManager::new("bad", ManagerConfig::default(), Arc::new(FakeExecutor::new()));
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn builtin_pipx_config_drives_generic_adapter() {
    let exec = Arc::new(FakeExecutor::new().with_binary("pipx"));
    exec.respond(
      "pipx list --short",
      CommandOutput::ok("black 24.1.0\nruff 0.4.1\n"),
    );
    let m = GenericManager::new("pipx", default_config("pipx").unwrap(), exec).unwrap();
    let cancel = CancellationToken::new();
    assert!(m.is_available(&cancel).await.unwrap());
    assert_eq!(m.list_installed(&cancel).await.unwrap(), vec!["black", "ruff"]);
  }
}
