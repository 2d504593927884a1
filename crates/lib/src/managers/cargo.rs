//! Cargo adapter for `cargo install`ed binaries.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::classify::ErrorMatcher;
use super::tool::{Tool, argv};
use super::{CommandExecutor, ManagerError, Operation, PackageInfo, PackageManager};

pub const NAME: &str = "cargo";

/// `ripgrep v14.1.0:` or `bat v0.24.0 (/path/to/src):`
static LIST_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\S+) v([^\s:]+).*:$").unwrap());

/// `ripgrep = "14.1.0"    # description`
static SEARCH_LINE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"^(\S+)\s*=\s*"([^"]*)"\s*(?:#\s*(.*))?$"#).unwrap());

#[derive(Debug)]
pub struct CargoManager {
  tool: Tool,
}

struct SearchEntry {
  name: String,
  version: String,
  description: Option<String>,
}

fn parse_search(stdout: &str) -> Vec<SearchEntry> {
  stdout
    .lines()
    .filter_map(|line| SEARCH_LINE.captures(line.trim()))
    .map(|caps| SearchEntry {
      name: caps[1].to_string(),
      version: caps[2].to_string(),
      description: caps.get(3).map(|m| m.as_str().trim().to_string()).filter(|d| !d.is_empty()),
    })
    .collect()
}

impl CargoManager {
  pub fn new(exec: Arc<dyn CommandExecutor>) -> Self {
    let matcher = ErrorMatcher::new()
      .idempotent(Operation::Install, ["already exists", "already installed"])
      .idempotent(Operation::Uninstall, ["did not match any packages"])
      .idempotent(Operation::Upgrade, ["already installed", "up to date"])
      .not_found(["could not find", "no matching package"]);
    Self {
      tool: Tool::new(NAME, "cargo", exec, matcher),
    }
  }

  /// `(name, version)` for every installed crate.
  async fn installed(&self, cancel: &CancellationToken) -> Result<Vec<(String, String)>, ManagerError> {
    let output = self
      .tool
      .query(cancel, Operation::List, "", &argv(&["cargo", "install", "--list"]))
      .await?;
    Ok(
      output
        .stdout
        .lines()
        .filter_map(|line| LIST_LINE.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect(),
    )
  }
}

#[async_trait]
impl PackageManager for CargoManager {
  fn name(&self) -> &str {
    NAME
  }

  async fn is_available(&self, _cancel: &CancellationToken) -> Result<bool, ManagerError> {
    Ok(self.tool.on_path())
  }

  async fn list_installed(&self, cancel: &CancellationToken) -> Result<Vec<String>, ManagerError> {
    Ok(self.installed(cancel).await?.into_iter().map(|(name, _)| name).collect())
  }

  async fn install(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError> {
    self
      .tool
      .mutate(cancel, Operation::Install, name, &argv(&["cargo", "install", name]))
      .await?;
    info!(manager = NAME, package = name, "installed package");
    Ok(())
  }

  async fn uninstall(&self, cancel: &CancellationToken, name: &str) -> Result<(), ManagerError> {
    self
      .tool
      .mutate(cancel, Operation::Uninstall, name, &argv(&["cargo", "uninstall", name]))
      .await?;
    info!(manager = NAME, package = name, "uninstalled package");
    Ok(())
  }

  /// Cargo has no native upgrade; reinstalling with `--force` replaces the binary.
  /// An empty `names` upgrades every installed crate.
  async fn upgrade(&self, cancel: &CancellationToken, names: &[String]) -> Result<(), ManagerError> {
    let targets = if names.is_empty() {
      self.list_installed(cancel).await?
    } else {
      names.to_vec()
    };

    let mut first_error = None;
    for name in &targets {
      let result = self
        .tool
        .mutate(cancel, Operation::Upgrade, name, &argv(&["cargo", "install", "--force", name]))
        .await;
      match result {
        Ok(()) => {}
        Err(err) if err.is_cancelled() => return Err(err),
        Err(err) => {
          warn!(manager = NAME, package = %name, error = %err, "upgrade failed");
          first_error.get_or_insert(err);
        }
      }
    }
    first_error.map_or(Ok(()), Err)
  }

  async fn search(&self, cancel: &CancellationToken, query: &str) -> Result<Vec<String>, ManagerError> {
    let output = self
      .tool
      .query(cancel, Operation::Search, query, &argv(&["cargo", "search", query, "--limit", "20"]))
      .await?;
    Ok(parse_search(&output.stdout).into_iter().map(|e| e.name).collect())
  }

  async fn info(&self, cancel: &CancellationToken, name: &str) -> Result<PackageInfo, ManagerError> {
    let installed = self.installed_version(cancel, name).await?;
    let output = self
      .tool
      .query(cancel, Operation::Info, name, &argv(&["cargo", "search", name, "--limit", "1"]))
      .await?;
    let found = parse_search(&output.stdout).into_iter().find(|e| e.name == name);

    match (found, installed) {
      (None, None) => Err(ManagerError::PackageNotFound {
        manager: NAME.to_string(),
        package: name.to_string(),
      }),
      (found, installed) => {
        let (latest, description) = found.map_or((None, None), |e| (Some(e.version), e.description));
        Ok(PackageInfo {
          name: name.to_string(),
          manager: NAME.to_string(),
          installed: installed.is_some(),
          version: installed.or(latest),
          description,
          homepage: Some(format!("https://crates.io/crates/{}", name)),
          ..Default::default()
        })
      }
    }
  }

  async fn installed_version(&self, cancel: &CancellationToken, name: &str) -> Result<Option<String>, ManagerError> {
    Ok(
      self
        .installed(cancel)
        .await?
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, version)| version),
    )
  }
}
