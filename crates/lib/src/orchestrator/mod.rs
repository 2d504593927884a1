//! Drives Desired → Actual → Reconcile → Apply across resources.
//!
//! Items converge one at a time and independently: a failed item is recorded
//! and the batch continues. The lock file is written after every item that
//! changed the system, so a crash loses at most the item in flight. Lock
//! errors, unlike item errors, abort the apply.

mod hooks;
mod types;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use hooks::{HookError, HookPhase, HookRunner, HooksConfig, HookSpec, ShellHookRunner, run_phase};
pub use types::*;

use crate::lock::{LockRecord, LockStore};
use crate::reconcile::{StateSummary, reconcile_items};
use crate::resource::{ApplyOutcome, Resource};
use crate::types::{Item, ItemState};

pub struct Orchestrator {
  resources: Vec<Box<dyn Resource>>,
  lock: LockStore,
  hooks: HooksConfig,
  hook_runner: Arc<dyn HookRunner>,
}

impl std::fmt::Debug for Orchestrator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Orchestrator")
      .field("resources", &self.resources.iter().map(|r| r.id()).collect::<Vec<_>>())
      .field("lock", &self.lock)
      .field("hooks", &self.hooks)
      .finish()
  }
}

impl Orchestrator {
  pub fn new(lock: LockStore, hooks: HooksConfig, hook_runner: Arc<dyn HookRunner>) -> Self {
    Self {
      resources: Vec::new(),
      lock,
      hooks,
      hook_runner,
    }
  }

  pub fn with_resource(mut self, resource: Box<dyn Resource>) -> Self {
    self.resources.push(resource);
    self
  }

  /// Reconciled state of every resource, without changing anything.
  pub async fn reconcile(&self, cancel: &CancellationToken) -> Result<Vec<DomainStatus>, ApplyError> {
    let mut statuses = Vec::with_capacity(self.resources.len());
    for resource in &self.resources {
      let context = |source| ApplyError::Resource {
        resource: resource.id().to_string(),
        source,
      };
      let desired = resource.desired().map_err(context)?;
      let actual = resource.actual(cancel).await.map_err(context)?;
      let items = reconcile_items(&desired, &actual);
      let summary = StateSummary::from_items(&items);
      debug!(
        resource = resource.id(),
        managed = summary.managed,
        missing = summary.missing,
        untracked = summary.untracked,
        degraded = summary.degraded,
        "reconciled"
      );
      statuses.push(DomainStatus {
        resource: resource.id().to_string(),
        domain: resource.domain(),
        items,
        summary,
      });
    }
    Ok(statuses)
  }

  /// Converge every item that is not managed.
  ///
  /// A failing pre-apply hook aborts before any item is touched. A failing
  /// post-apply hook is reported in the result; completed work stays.
  pub async fn apply(&self, cancel: &CancellationToken, options: ApplyOptions) -> Result<ApplyReport, ApplyError> {
    let mut hook_errors = Vec::new();
    if !options.dry_run {
      let tolerated = run_phase(self.hook_runner.as_ref(), cancel, HookPhase::PreApply, &self.hooks.pre_apply)
        .await
        .map_err(ApplyError::PreHook)?;
      hook_errors.extend(tolerated);
    }

    let mut lock = self.lock.load()?;
    let statuses = self.reconcile(cancel).await?;

    let mut results = Vec::new();
    for (resource, status) in self.resources.iter().zip(&statuses) {
      for item in status.items.iter().filter(|i| i.state.needs_action()) {
        if item.state == ItemState::Untracked && !options.prune_untracked {
          continue;
        }
        if cancel.is_cancelled() {
          return Err(ApplyError::Cancelled);
        }
        if options.dry_run {
          results.push(ItemResult::new(item, planned(item.state)));
          continue;
        }
        let result = self.apply_item(cancel, resource.as_ref(), item, &mut lock).await?;
        results.push(result);
      }
    }

    if !options.dry_run {
      match run_phase(self.hook_runner.as_ref(), cancel, HookPhase::PostApply, &self.hooks.post_apply).await {
        Ok(tolerated) => hook_errors.extend(tolerated),
        Err(err) if err.is_cancelled() => return Err(ApplyError::Cancelled),
        Err(err) => {
          warn!(error = %err, "post-apply hook failed");
          hook_errors.push(format!("post-apply hook failed: {}", err));
        }
      }
    }

    let report = ApplyReport::new(options.dry_run, results, hook_errors);
    info!(
      dry_run = options.dry_run,
      added = report.summary.added,
      updated = report.summary.updated,
      removed = report.summary.removed,
      skipped = report.summary.skipped,
      failed = report.summary.failed,
      "apply finished"
    );
    Ok(report)
  }

  async fn apply_item(
    &self,
    cancel: &CancellationToken,
    resource: &dyn Resource,
    item: &Item,
    lock: &mut LockRecord,
  ) -> Result<ItemResult, ApplyError> {
    let key = item.key();
    let outcome = match resource.apply(cancel, item).await {
      Ok(outcome) => outcome,
      Err(err) if err.is_cancelled() => return Err(ApplyError::Cancelled),
      Err(err) => {
        warn!(resource = resource.id(), item = %key, error = %err, "apply failed");
        return Ok(ItemResult::failed(item, err));
      }
    };

    let status = match outcome {
      ApplyOutcome::Added(entry) => {
        lock.upsert_resource(entry);
        ItemStatus::Added
      }
      ApplyOutcome::Updated(entry) => {
        lock.upsert_resource(entry);
        ItemStatus::Updated
      }
      ApplyOutcome::Removed(id) => {
        lock.remove_resource(&id);
        ItemStatus::Removed
      }
      ApplyOutcome::Skipped(reason) => {
        info!(resource = resource.id(), item = %key, reason = %reason, "skipped");
        return Ok(ItemResult::skipped(item, reason));
      }
    };
    self.lock.write(lock)?;
    info!(resource = resource.id(), item = %key, status = %status, "applied");
    Ok(ItemResult::new(item, status))
  }
}

fn planned(state: ItemState) -> ItemStatus {
  match state {
    ItemState::Degraded => ItemStatus::WouldUpdate,
    ItemState::Untracked => ItemStatus::WouldRemove,
    ItemState::Missing | ItemState::Managed => ItemStatus::WouldAdd,
  }
}
