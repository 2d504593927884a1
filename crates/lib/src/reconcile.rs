//! Desired versus actual reconciliation.
//!
//! Pure functions that partition two item sets into managed, missing,
//! untracked and degraded items. Nothing here performs I/O apart from the
//! drift comparators that resources attach to their items.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{DRIFT_MODIFIED, Item, ItemState, META_DRIFT_STATUS, Metadata};

/// Reconcile two item sets keyed by item name.
pub fn reconcile(desired: &[Item], actual: &[Item]) -> Vec<Item> {
  reconcile_with_key(desired, actual, |item| item.name.clone())
}

/// Reconcile two item sets keyed by [`Item::key`].
///
/// Packages are keyed by `manager:name` and dotfiles by destination path.
pub fn reconcile_items(desired: &[Item], actual: &[Item]) -> Vec<Item> {
  reconcile_with_key(desired, actual, Item::key)
}

/// Reconcile `desired` against `actual` using `key_fn` to match items.
///
/// - Desired with a same-key actual item → `Managed`, or `Degraded` when the
///   item's comparator reports a difference.
/// - Desired without a match → `Missing`.
/// - Actual without a match → `Untracked`.
///
/// Matched items keep the desired item's metadata; the actual item only fills
/// keys the desired item does not set.
///
/// Output order is the desired order followed by untracked items in actual
/// order. When a side contains several items with the same key only the first
/// one takes part.
pub fn reconcile_with_key<F>(desired: &[Item], actual: &[Item], key_fn: F) -> Vec<Item>
where
  F: Fn(&Item) -> String,
{
  let mut actual_by_key: HashMap<String, &Item> = HashMap::with_capacity(actual.len());
  let mut actual_order: Vec<(String, &Item)> = Vec::with_capacity(actual.len());
  for item in actual {
    let key = key_fn(item);
    if actual_by_key.contains_key(&key) {
      debug!(key = %key, "duplicate actual item ignored");
      continue;
    }
    actual_by_key.insert(key.clone(), item);
    actual_order.push((key, item));
  }

  let mut seen: HashSet<String> = HashSet::with_capacity(desired.len());
  let mut result = Vec::with_capacity(desired.len() + actual.len());

  for wanted in desired {
    let key = key_fn(wanted);
    if !seen.insert(key.clone()) {
      debug!(key = %key, "duplicate desired item ignored");
      continue;
    }

    let mut item = wanted.clone();
    match actual_by_key.get(&key) {
      Some(found) => {
        merge_metadata(&mut item.metadata, &found.metadata);
        if item.comparator.is_none() {
          item.comparator = found.comparator.clone();
        }
        item.state = ItemState::Managed;
        if is_drifted(&item, &key) {
          item.state = ItemState::Degraded;
          item.metadata.insert(
            META_DRIFT_STATUS.to_string(),
            serde_json::Value::String(DRIFT_MODIFIED.to_string()),
          );
        }
      }
      None => item.state = ItemState::Missing,
    }
    result.push(item);
  }

  for (key, found) in actual_order {
    if seen.contains(&key) {
      continue;
    }
    let mut item = found.clone();
    item.state = ItemState::Untracked;
    result.push(item);
  }

  result
}

/// Fill keys missing from `target` with values from `source`.
fn merge_metadata(target: &mut Metadata, source: &Metadata) {
  for (key, value) in source {
    target.entry(key.clone()).or_insert_with(|| value.clone());
  }
}

fn is_drifted(item: &Item, key: &str) -> bool {
  let Some(comparator) = &item.comparator else {
    return false;
  };
  match comparator.compare() {
    Ok(identical) => !identical,
    Err(err) => {
      warn!(key = %key, error = %err, "drift check failed, treating item as managed");
      false
    }
  }
}

/// Item counts per state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateSummary {
  pub managed: usize,
  pub missing: usize,
  pub untracked: usize,
  pub degraded: usize,
}

impl StateSummary {
  pub fn from_items(items: &[Item]) -> Self {
    let mut summary = Self::default();
    for item in items {
      match item.state {
        ItemState::Managed => summary.managed += 1,
        ItemState::Missing => summary.missing += 1,
        ItemState::Untracked => summary.untracked += 1,
        ItemState::Degraded => summary.degraded += 1,
      }
    }
    summary
  }

  pub fn total(&self) -> usize {
    self.managed + self.missing + self.untracked + self.degraded
  }

  /// Returns true if every desired item is present and unchanged.
  pub fn is_converged(&self) -> bool {
    self.missing == 0 && self.degraded == 0
  }
}
