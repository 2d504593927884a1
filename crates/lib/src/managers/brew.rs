//! Homebrew adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::classify::{ErrorKind, ErrorMatcher};
use super::tool::{Tool, argv};
use super::{CommandExecutor, ManagerError, Operation, PackageInfo, PackageManager};

pub const NAME: &str = "brew";

const NOT_FOUND: [&str; 4] = [
  "no available formula",
  "no formulae or casks found",
  "no cask with this name",
  "no formulae found",
];

#[derive(Debug, Deserialize)]
struct InfoDoc {
  #[serde(default)]
  formulae: Vec<FormulaInfo>,
  #[serde(default)]
  casks: Vec<CaskInfo>,
}

#[derive(Debug, Deserialize)]
struct FormulaInfo {
  name: String,
  desc: Option<String>,
  homepage: Option<String>,
  #[serde(default)]
  versions: Versions,
  #[serde(default)]
  installed: Vec<Installed>,
}

#[derive(Debug, Default, Deserialize)]
struct Versions {
  stable: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Installed {
  version: String,
}

#[derive(Debug, Deserialize)]
struct CaskInfo {
  token: String,
  desc: Option<String>,
  homepage: Option<String>,
  version: Option<String>,
  installed: Option<String>,
}

#[derive(Debug)]
pub struct BrewManager {
  tool: Tool,
}

impl BrewManager {
  pub fn new(exec: Arc<dyn CommandExecutor>) -> Self {
    let matcher = ErrorMatcher::new()
      .idempotent(Operation::Install, ["already installed"])
      .idempotent(Operation::Uninstall, ["no such keg", "is not installed"])
      .idempotent(Operation::Upgrade, ["already up-to-date", "already installed"])
      .not_found(NOT_FOUND)
      .permission(["operation not permitted"]);
    Self {
      tool: Tool::new(NAME, "brew", exec, matcher),
    }
  }

  fn parse_info(&self, name: &str, stdout: &str) -> Result<PackageInfo, ManagerError> {
    let doc: InfoDoc = serde_json::from_str(stdout).map_err(|e| self.tool.parse_error(Operation::Info, e.to_string()))?;

    if let Some(formula) = doc.formulae.into_iter().next() {
      let installed = formula.installed.last().map(|i| i.version.clone());
      return Ok(PackageInfo {
        name: formula.name,
        manager: NAME.to_string(),
        version: installed.clone().or(formula.versions.stable),
        description: formula.desc,
        homepage: formula.homepage,
        installed: installed.is_some(),
        ..Default::default()
      });
    }
    if let Some(cask) = doc.casks.into_iter().next() {
      return Ok(PackageInfo {
        name: cask.token,
        manager: NAME.to_string(),
        version: cask.installed.clone().or(cask.version),
        description: cask.desc,
        homepage: cask.homepage,
        installed: cask.installed.is_some(),
        ..Default::default()
      });
    }
    Err(ManagerError::PackageNotFound {
      manager: NAME.to_string(),
      package: name.to_string(),
    })
  }
}

#[async_trait]
impl PackageManager for BrewManager {
  fn name(&self) -> &str {
    NAME
  }

  async fn is_available(&self, _cancel: &CancellationToken) -> Result<bool, ManagerError> {
    Ok(self.tool.on_path())
  }

  async fn list_installed(&self, cancel: &CancellationToken) -> Result<Vec<String>, ManagerError> {
    let output = self.tool.query(cancel, Operation::List, "", &argv(&["brew", "list", "-1"])).await?;
    Ok(
      output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect(),
    )
  }

  async fn install(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError> {
    self
      .tool
      .mutate(cancel, Operation::Install, name, &argv(&["brew", "install", name]))
      .await?;
    info!(manager = NAME, package = name, "installed package");
    Ok(())
  }

  async fn uninstall(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError> {
    self
      .tool
      .mutate(cancel, Operation::Uninstall, name, &argv(&["brew", "uninstall", name]))
      .await?;
    info!(manager = NAME, package = name, "uninstalled package");
    Ok(())
  }

  async fn upgrade(&self, cancel: &CancellationToken, names: &[String]) -> Result<(), ManagerError> {
    let mut args = argv(&["brew", "upgrade"]);
    args.extend(names.iter().cloned());
    self.tool.mutate(cancel, Operation::Upgrade, &names.join(" "), &args).await
  }

  async fn search(&self, cancel: &CancellationToken, query: &str) -> Result<Vec<String>, ManagerError> {
    let output = self.tool.run(cancel, Operation::Search, &argv(&["brew", "search", query])).await?;
    if !output.success() {
      if self.tool.matcher.classify(Operation::Search, &output.combined()) == ErrorKind::NotFound {
        return Ok(Vec::new());
      }
      return Err(self.tool.failure(Operation::Search, query, &output));
    }
    Ok(
      output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("==>"))
        .map(str::to_string)
        .collect(),
    )
  }

  async fn info(&self, cancel: &CancellationToken, name: &str) -> Result<PackageInfo, ManagerError> {
    let output = self
      .tool
      .run(cancel, Operation::Info, &argv(&["brew", "info", "--json=v2", name]))
      .await?;
    if !output.success() {
      return match self.tool.matcher.classify(Operation::Info, &output.combined()) {
        ErrorKind::NotFound => Err(ManagerError::PackageNotFound {
          manager: NAME.to_string(),
          package: name.to_string(),
        }),
        _ => Err(self.tool.failure(Operation::Info, name, &output)),
      };
    }
    self.parse_info(name, &output.stdout)
  }

  async fn is_installed(&self, cancel: &CancellationToken, name: &str) -> Result<bool, ManagerError> {
    Ok(self.installed_version(cancel, name).await?.is_some())
  }

  async fn installed_version(&self, cancel: &CancellationToken, name: &str) -> Result<Option<String>, ManagerError> {
    let output = self
      .tool
      .run(cancel, Operation::Info, &argv(&["brew", "list", "--versions", name]))
      .await?;
    if !output.success() {
      return Ok(None);
    }
    // "jq 1.7.1 1.6" lists every installed version, newest last.
    Ok(output.stdout.split_whitespace().skip(1).last().map(str::to_string))
  }
}
