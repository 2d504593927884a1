//! npm adapter for globally installed packages.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::classify::{ErrorKind, ErrorMatcher};
use super::defaults::default_config;
use super::extract::MetadataExtractors;
use super::tool::{Tool, argv};
use super::{CommandExecutor, ManagerError, Operation, PackageInfo, PackageManager};
use crate::types::Metadata;

pub const NAME: &str = "npm";

#[derive(Debug, Deserialize)]
struct SearchHit {
  name: String,
}

#[derive(Debug, Deserialize)]
struct ViewDoc {
  name: String,
  version: Option<String>,
  description: Option<String>,
  homepage: Option<String>,
}

#[derive(Debug)]
pub struct NpmManager {
  tool: Tool,
  extractors: MetadataExtractors,
}

impl NpmManager {
  pub fn new(exec: Arc<dyn CommandExecutor>) -> Self {
    let matcher = ErrorMatcher::new()
      .idempotent(Operation::Install, ["already installed"])
      .idempotent(Operation::Upgrade, ["up to date"])
      .not_found(["404 not found", "e404", "is not in this registry", "is not in the npm registry"]);
    let extractors = default_config(NAME)
      .and_then(|c| MetadataExtractors::from_config(NAME, &c.metadata_extractors).ok())
      .unwrap_or_default();
    Self {
      tool: Tool::new(NAME, "npm", exec, matcher),
      extractors,
    }
  }

  /// The `dependencies` object of `npm list -g --json`.
  async fn global_tree(&self, cancel: &CancellationToken) -> Result<serde_json::Map<String, Value>, ManagerError> {
    let output = self
      .tool
      .run(cancel, Operation::List, &argv(&["npm", "list", "-g", "--depth=0", "--json"]))
      .await?;
    // npm exits 1 on peer dependency warnings while still printing the tree.
    if !output.success() && output.stdout.trim().is_empty() {
      return Err(self.tool.failure(Operation::List, "", &output));
    }
    if output.stdout.trim().is_empty() {
      return Ok(serde_json::Map::new());
    }
    let doc: Value =
      serde_json::from_str(&output.stdout).map_err(|e| self.tool.parse_error(Operation::List, e.to_string()))?;
    match doc.get("dependencies") {
      Some(Value::Object(deps)) => Ok(deps.clone()),
      None | Some(Value::Null) => Ok(serde_json::Map::new()),
      Some(_) => Err(self.tool.parse_error(Operation::List, "dependencies is not an object")),
    }
  }
}

#[async_trait]
impl PackageManager for NpmManager {
  fn name(&self) -> &str {
    NAME
  }

  async fn is_available(&self, _cancel: &CancellationToken) -> Result<bool, ManagerError> {
    Ok(self.tool.on_path())
  }

  async fn list_installed(&self, cancel: &CancellationToken) -> Result<Vec<String>, ManagerError> {
    Ok(self.global_tree(cancel).await?.keys().cloned().collect())
  }

  async fn install(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError> {
    self
      .tool
      .mutate(cancel, Operation::Install, name, &argv(&["npm", "install", "-g", name]))
      .await?;
    info!(manager = NAME, package = name, "installed package");
    Ok(())
  }

  async fn uninstall(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError> {
    self
      .tool
      .mutate(cancel, Operation::Uninstall, name, &argv(&["npm", "uninstall", "-g", name]))
      .await?;
    info!(manager = NAME, package = name, "uninstalled package");
    Ok(())
  }

  async fn upgrade(&self, cancel: &CancellationToken, names: &[String]) -> Result<(), ManagerError> {
    let mut args = argv(&["npm", "update", "-g"]);
    args.extend(names.iter().cloned());
    self.tool.mutate(cancel, Operation::Upgrade, &names.join(" "), &args).await
  }

  async fn search(&self, cancel: &CancellationToken, query: &str) -> Result<Vec<String>, ManagerError> {
    let output = self
      .tool
      .query(cancel, Operation::Search, query, &argv(&["npm", "search", "--json", query]))
      .await?;
    if output.stdout.trim().is_empty() {
      return Ok(Vec::new());
    }
    let hits: Vec<SearchHit> =
      serde_json::from_str(&output.stdout).map_err(|e| self.tool.parse_error(Operation::Search, e.to_string()))?;
    Ok(hits.into_iter().map(|h| h.name).collect())
  }

  async fn info(&self, cancel: &CancellationToken, name: &str) -> Result<PackageInfo, ManagerError> {
    let output = self
      .tool
      .run(cancel, Operation::Info, &argv(&["npm", "view", name, "--json"]))
      .await?;
    if !output.success() {
      if self.tool.matcher.classify(Operation::Info, &output.combined()) == ErrorKind::NotFound {
        return Err(ManagerError::PackageNotFound {
          manager: NAME.to_string(),
          package: name.to_string(),
        });
      }
      return Err(self.tool.failure(Operation::Info, name, &output));
    }
    let view: ViewDoc =
      serde_json::from_str(&output.stdout).map_err(|e| self.tool.parse_error(Operation::Info, e.to_string()))?;
    let installed = self.installed_version(cancel, name).await?;
    Ok(PackageInfo {
      name: view.name,
      manager: NAME.to_string(),
      version: installed.clone().or(view.version),
      description: view.description,
      homepage: view.homepage,
      installed: installed.is_some(),
      metadata: self.metadata_for(name),
    })
  }

  async fn installed_version(&self, cancel: &CancellationToken, name: &str) -> Result<Option<String>, ManagerError> {
    let tree = self.global_tree(cancel).await?;
    Ok(
      tree
        .get(name)
        .and_then(|dep| dep.get("version"))
        .and_then(Value::as_str)
        .map(str::to_string),
    )
  }

  async fn is_installed(&self, cancel: &CancellationToken, name: &str) -> Result<bool, ManagerError> {
    Ok(self.global_tree(cancel).await?.contains_key(name))
  }

  fn metadata_for(&self, name: &str) -> Metadata {
    self.extractors.extract(name)
  }
}
