//! Direct package operations: install, uninstall, upgrade, info and search.
//!
//! Unlike [`Orchestrator::apply`](crate::orchestrator::Orchestrator::apply),
//! these act on the packages named on the command line. The lock file is
//! updated after every package that changed, and results use the same
//! per-item report as apply.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::Context;
use crate::lock::{LockError, ResourceEntry};
use crate::managers::{
  InvalidPackageSpec, ManagerError, PackageInfo, PackageManager, PackageSpec, RegistryError, SearchResult,
  ensure_available, search_all,
};
use crate::orchestrator::{ApplyReport, ItemResult, ItemStatus};
use crate::types::Item;

#[derive(Debug, Error)]
pub enum OperationError {
  #[error(transparent)]
  Spec(#[from] InvalidPackageSpec),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Manager(#[from] ManagerError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error("{package} timed out after {timeout:?}")]
  Timeout { package: String, timeout: Duration },

  #[error("operation was cancelled")]
  Cancelled,
}

impl OperationError {
  pub fn is_cancelled(&self) -> bool {
    match self {
      OperationError::Cancelled => true,
      OperationError::Manager(err) => err.is_cancelled(),
      _ => false,
    }
  }
}

/// Package details plus whether plonk manages the package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDetails {
  pub managed: bool,
  #[serde(flatten)]
  pub info: PackageInfo,
}

async fn bounded<T, F>(timeout: Duration, spec: &PackageSpec, fut: F) -> Result<T, OperationError>
where
  F: Future<Output = Result<T, ManagerError>>,
{
  match tokio::time::timeout(timeout, fut).await {
    Ok(result) => result.map_err(OperationError::from),
    Err(_) => Err(OperationError::Timeout {
      package: spec.to_string(),
      timeout,
    }),
  }
}

/// Resolve the adapter for `spec` and make sure its tool is present.
async fn ready_manager(
  ctx: &Context,
  cancel: &CancellationToken,
  spec: &PackageSpec,
) -> Result<std::sync::Arc<dyn PackageManager>, OperationError> {
  let manager = ctx.registry.get(&spec.manager)?;
  bounded(ctx.config.package_timeout(), spec, ensure_available(manager.as_ref(), cancel)).await?;
  Ok(manager)
}

/// Version after a change, or empty when the manager cannot tell.
async fn version_of(ctx: &Context, cancel: &CancellationToken, manager: &dyn PackageManager, spec: &PackageSpec) -> String {
  match bounded(ctx.config.package_timeout(), spec, manager.installed_version(cancel, &spec.name)).await {
    Ok(version) => version.unwrap_or_default(),
    Err(err) => {
      warn!(package = %spec, error = %err, "could not read installed version");
      String::new()
    }
  }
}

fn invalid(raw: &str, err: InvalidPackageSpec) -> ItemResult {
  ItemResult::failed(&Item::package("", raw), err)
}

/// Install each package and record it in the lock.
///
/// Packages already in the lock are skipped. A failure is recorded and the
/// remaining packages are still attempted.
pub async fn install(ctx: &Context, cancel: &CancellationToken, specs: &[String]) -> Result<ApplyReport, OperationError> {
  let mut lock = ctx.lock.load()?;
  let mut results = Vec::with_capacity(specs.len());

  for raw in specs {
    if cancel.is_cancelled() {
      return Err(OperationError::Cancelled);
    }
    let spec = match ctx.parse_spec(raw) {
      Ok(spec) => spec,
      Err(err) => {
        results.push(invalid(raw, err));
        continue;
      }
    };
    let item = Item::package(&spec.manager, &spec.name);
    if lock.has_package(&spec.manager, &spec.name) {
      results.push(ItemResult::skipped(&item, "already managed"));
      continue;
    }

    let installed = async {
      let manager = ready_manager(ctx, cancel, &spec).await?;
      bounded(ctx.config.package_timeout(), &spec, manager.install(cancel, &spec.name)).await?;
      Ok::<_, OperationError>(version_of(ctx, cancel, manager.as_ref(), &spec).await)
    };
    match installed.await {
      Ok(version) => {
        lock.upsert_resource(ResourceEntry::package(&spec.manager, &spec.name, &version, Some(Utc::now())));
        ctx.lock.write(&mut lock)?;
        info!(package = %spec, version = %version, "installed");
        results.push(ItemResult::new(&item, ItemStatus::Added));
      }
      Err(err) if err.is_cancelled() => return Err(OperationError::Cancelled),
      Err(err) => {
        warn!(package = %spec, error = %err, "install failed");
        results.push(ItemResult::failed(&item, err));
      }
    }
  }
  Ok(ApplyReport::new(false, results, Vec::new()))
}

/// Uninstall each package and drop it from the lock.
///
/// A package that is already absent is still removed from the lock.
pub async fn uninstall(
  ctx: &Context,
  cancel: &CancellationToken,
  specs: &[String],
) -> Result<ApplyReport, OperationError> {
  let mut lock = ctx.lock.load()?;
  let mut results = Vec::with_capacity(specs.len());

  for raw in specs {
    if cancel.is_cancelled() {
      return Err(OperationError::Cancelled);
    }
    let spec = match ctx.parse_spec(raw) {
      Ok(spec) => spec,
      Err(err) => {
        results.push(invalid(raw, err));
        continue;
      }
    };
    let item = Item::package(&spec.manager, &spec.name);

    let removed = async {
      let manager = ready_manager(ctx, cancel, &spec).await?;
      bounded(ctx.config.package_timeout(), &spec, manager.uninstall(cancel, &spec.name)).await
    };
    match removed.await {
      Ok(()) => {
        if lock.remove_package(&spec.manager, &spec.name) {
          ctx.lock.write(&mut lock)?;
        }
        info!(package = %spec, "uninstalled");
        results.push(ItemResult::new(&item, ItemStatus::Removed));
      }
      Err(err) if err.is_cancelled() => return Err(OperationError::Cancelled),
      Err(err) => {
        warn!(package = %spec, error = %err, "uninstall failed");
        results.push(ItemResult::failed(&item, err));
      }
    }
  }
  Ok(ApplyReport::new(false, results, Vec::new()))
}

/// Upgrade managed packages one at a time.
///
/// With no specs every package in the lock is upgraded. Packages the lock
/// does not know about are skipped, and a failed upgrade does not stop the
/// rest.
pub async fn upgrade(ctx: &Context, cancel: &CancellationToken, specs: &[String]) -> Result<ApplyReport, OperationError> {
  let mut lock = ctx.lock.load()?;
  let mut results = Vec::new();
  let mut targets = Vec::new();

  if specs.is_empty() {
    targets.extend(lock.package_items().into_iter().map(|item| PackageSpec {
      manager: item.manager,
      name: item.name,
    }));
  }
  for raw in specs {
    let spec = match ctx.parse_spec(raw) {
      Ok(spec) => spec,
      Err(err) => {
        results.push(invalid(raw, err));
        continue;
      }
    };
    if !lock.has_package(&spec.manager, &spec.name) {
      results.push(ItemResult::skipped(
        &Item::package(&spec.manager, &spec.name),
        "not managed",
      ));
      continue;
    }
    targets.push(spec);
  }

  for spec in targets {
    if cancel.is_cancelled() {
      return Err(OperationError::Cancelled);
    }
    let item = Item::package(&spec.manager, &spec.name);
    let upgraded = async {
      let manager = ready_manager(ctx, cancel, &spec).await?;
      let names = std::slice::from_ref(&spec.name);
      bounded(ctx.config.package_timeout(), &spec, manager.upgrade(cancel, names)).await?;
      Ok::<_, OperationError>(version_of(ctx, cancel, manager.as_ref(), &spec).await)
    };
    match upgraded.await {
      Ok(version) => {
        lock.upsert_resource(ResourceEntry::package(&spec.manager, &spec.name, &version, Some(Utc::now())));
        ctx.lock.write(&mut lock)?;
        info!(package = %spec, version = %version, "upgraded");
        results.push(ItemResult::new(&item, ItemStatus::Updated));
      }
      Err(err) if err.is_cancelled() => return Err(OperationError::Cancelled),
      Err(err) => {
        warn!(package = %spec, error = %err, "upgrade failed");
        results.push(ItemResult::failed(&item, err));
      }
    }
  }
  Ok(ApplyReport::new(false, results, Vec::new()))
}

/// Details for one package.
pub async fn info(ctx: &Context, cancel: &CancellationToken, raw: &str) -> Result<PackageDetails, OperationError> {
  let spec = ctx.parse_spec(raw)?;
  let manager = ready_manager(ctx, cancel, &spec).await?;
  let info = bounded(ctx.config.package_timeout(), &spec, manager.info(cancel, &spec.name)).await?;
  let managed = ctx.lock.load()?.has_package(&spec.manager, &spec.name);
  Ok(PackageDetails { managed, info })
}

/// Search every registered manager, or only one when the query is
/// `manager:term` for a known manager.
pub async fn search(
  ctx: &Context,
  cancel: &CancellationToken,
  query: &str,
) -> Result<Vec<SearchResult>, OperationError> {
  let (managers, term) = match query.split_once(':') {
    Some((manager, term)) if ctx.registry.contains(manager) => (vec![manager.to_string()], term),
    _ => (ctx.registry.names(), query),
  };
  let results = search_all(&ctx.registry, &managers, term, ctx.config.operation_timeout(), cancel).await;
  if cancel.is_cancelled() {
    return Err(OperationError::Cancelled);
  }
  Ok(results)
}
