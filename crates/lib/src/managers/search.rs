//! Concurrent search across managers.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{ManagerError, ManagerRegistry, Operation, PackageManager};

/// Matches from one manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
  pub manager: String,
  pub packages: Vec<String>,
}

/// Query every named manager at once, each bounded by `timeout`.
///
/// Unknown, unavailable, failing and slow managers contribute nothing.
/// Results are sorted by manager name and omit managers with no matches.
pub async fn search_all(
  registry: &ManagerRegistry,
  managers: &[String],
  query: &str,
  timeout: Duration,
  cancel: &CancellationToken,
) -> Vec<SearchResult> {
  let mut join_set = JoinSet::new();

  for name in managers {
    let manager = match registry.get(name) {
      Ok(manager) => manager,
      Err(err) => {
        debug!(manager = %name, error = %err, "skipping search");
        continue;
      }
    };
    let name = name.clone();
    let query = query.to_string();
    let cancel = cancel.clone();

    join_set.spawn(async move {
      let result = search_one(manager, &query, timeout, &cancel).await;
      (name, result)
    });
  }

  let mut results = Vec::new();
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok((manager, Ok(packages))) if !packages.is_empty() => results.push(SearchResult { manager, packages }),
      Ok((_, Ok(_))) => {}
      Ok((manager, Err(err))) => warn!(manager = %manager, error = %err, "search failed"),
      Err(err) => error!(error = %err, "search task panicked"),
    }
  }
  results.sort_by(|a, b| a.manager.cmp(&b.manager));
  results
}

async fn search_one(
  manager: Arc<dyn PackageManager>,
  query: &str,
  timeout: Duration,
  cancel: &CancellationToken,
) -> Result<Vec<String>, ManagerError> {
  let work = async {
    if !manager.is_available(cancel).await? {
      return Ok(Vec::new());
    }
    manager.search(cancel, query).await
  };
  tokio::time::timeout(timeout, work)
    .await
    .map_err(|_| ManagerError::Timeout {
      manager: manager.name().to_string(),
      operation: Operation::Search,
      timeout,
    })?
}
