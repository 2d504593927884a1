use serde::Serialize;

use super::hooks::HookError;
use crate::lock::LockError;
use crate::reconcile::StateSummary;
use crate::resource::ResourceError;
use crate::types::{Domain, Item};

/// Options for [`Orchestrator::apply`](super::Orchestrator::apply).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
  /// Report what would change without touching the system, lock or hooks.
  pub dry_run: bool,
  /// Remove untracked packages. Untracked dotfiles are never removed.
  pub prune_untracked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
  Added,
  Updated,
  Removed,
  Skipped,
  Failed,
  WouldAdd,
  WouldUpdate,
  WouldRemove,
}

impl ItemStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ItemStatus::Added => "added",
      ItemStatus::Updated => "updated",
      ItemStatus::Removed => "removed",
      ItemStatus::Skipped => "skipped",
      ItemStatus::Failed => "failed",
      ItemStatus::WouldAdd => "would-add",
      ItemStatus::WouldUpdate => "would-update",
      ItemStatus::WouldRemove => "would-remove",
    }
  }
}

impl std::fmt::Display for ItemStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Result of converging one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemResult {
  pub name: String,
  pub domain: Domain,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub manager: String,
  pub status: ItemStatus,
  /// Why an item was skipped.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl ItemResult {
  pub fn new(item: &Item, status: ItemStatus) -> Self {
    Self {
      name: item.name.clone(),
      domain: item.domain,
      manager: item.manager.clone(),
      status,
      reason: None,
      error: None,
    }
  }

  pub fn skipped(item: &Item, reason: impl Into<String>) -> Self {
    Self {
      reason: Some(reason.into()),
      ..Self::new(item, ItemStatus::Skipped)
    }
  }

  pub fn failed(item: &Item, error: impl ToString) -> Self {
    Self {
      error: Some(error.to_string()),
      ..Self::new(item, ItemStatus::Failed)
    }
  }

  /// `manager:name` for packages, the name otherwise.
  pub fn label(&self) -> String {
    if self.manager.is_empty() {
      self.name.clone()
    } else {
      format!("{}:{}", self.manager, self.name)
    }
  }
}

/// Counts per outcome. Dry-run statuses count with their real counterparts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
  pub total: usize,
  pub added: usize,
  pub updated: usize,
  pub removed: usize,
  pub skipped: usize,
  pub failed: usize,
}

impl ApplySummary {
  pub fn from_results(results: &[ItemResult]) -> Self {
    let mut summary = Self {
      total: results.len(),
      ..Self::default()
    };
    for result in results {
      match result.status {
        ItemStatus::Added | ItemStatus::WouldAdd => summary.added += 1,
        ItemStatus::Updated | ItemStatus::WouldUpdate => summary.updated += 1,
        ItemStatus::Removed | ItemStatus::WouldRemove => summary.removed += 1,
        ItemStatus::Skipped => summary.skipped += 1,
        ItemStatus::Failed => summary.failed += 1,
      }
    }
    summary
  }

  pub fn succeeded(&self) -> usize {
    self.added + self.updated + self.removed
  }
}

/// Overall result of a batch, mapped onto process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
  Success,
  Partial,
  Failure,
}

impl Outcome {
  /// Nothing failed: success. Everything attempted failed: failure.
  /// Anything in between is partial. Skipped items are not attempts.
  pub fn from_summary(summary: &ApplySummary) -> Self {
    if summary.failed == 0 {
      Outcome::Success
    } else if summary.succeeded() == 0 {
      Outcome::Failure
    } else {
      Outcome::Partial
    }
  }

  pub fn exit_code(&self) -> i32 {
    match self {
      Outcome::Success => 0,
      Outcome::Partial => 2,
      Outcome::Failure => 1,
    }
  }
}

/// Per-item results of an apply pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
  pub dry_run: bool,
  pub results: Vec<ItemResult>,
  pub summary: ApplySummary,
  /// Hook failures that did not abort the apply.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub hook_errors: Vec<String>,
}

impl ApplyReport {
  pub fn new(dry_run: bool, results: Vec<ItemResult>, hook_errors: Vec<String>) -> Self {
    Self {
      dry_run,
      summary: ApplySummary::from_results(&results),
      results,
      hook_errors,
    }
  }

  /// Item outcome, downgraded to partial when a hook failed after success.
  pub fn outcome(&self) -> Outcome {
    match Outcome::from_summary(&self.summary) {
      Outcome::Success if !self.hook_errors.is_empty() => Outcome::Partial,
      outcome => outcome,
    }
  }

  pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
    self.results.iter().filter(|r| r.status == ItemStatus::Failed)
  }
}

/// Reconciled view of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStatus {
  pub resource: String,
  pub domain: Domain,
  pub items: Vec<Item>,
  pub summary: StateSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
  #[error("pre-apply hook failed: {0}")]
  PreHook(#[source] HookError),

  #[error(transparent)]
  Lock(#[from] LockError),

  #[error("failed to read {resource} state: {source}")]
  Resource {
    resource: String,
    #[source]
    source: ResourceError,
  },

  #[error("apply was cancelled")]
  Cancelled,
}

impl ApplyError {
  pub fn is_cancelled(&self) -> bool {
    match self {
      ApplyError::Cancelled => true,
      ApplyError::PreHook(err) => err.is_cancelled(),
      ApplyError::Resource { source, .. } => source.is_cancelled(),
      ApplyError::Lock(_) => false,
    }
  }
}
