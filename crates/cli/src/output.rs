//! CLI output formatting utilities.
//!
//! User-facing output goes to stdout; errors and warnings to stderr. Colors
//! are only used when the stream supports them.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use plonk_lib::orchestrator::{ApplyReport, ItemResult, ItemStatus};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ADD: &str = "+";
  pub const MODIFY: &str = "~";
  pub const REMOVE: &str = "-";
  pub const SKIP: &str = "○";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    format!("{}m {}s", secs / 60, secs % 60)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

fn status_symbol(status: ItemStatus) -> String {
  let symbol = match status {
    ItemStatus::Added | ItemStatus::WouldAdd => symbols::ADD,
    ItemStatus::Updated | ItemStatus::WouldUpdate => symbols::MODIFY,
    ItemStatus::Removed | ItemStatus::WouldRemove => symbols::REMOVE,
    ItemStatus::Skipped => symbols::SKIP,
    ItemStatus::Failed => symbols::ERROR,
  };
  match status {
    ItemStatus::Failed => symbol.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
    ItemStatus::Skipped => symbol.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string(),
    _ => symbol.if_supports_color(Stream::Stdout, |s| s.green()).to_string(),
  }
}

/// One line for an item result, e.g. `+ brew:jq (added)`.
pub fn format_result(result: &ItemResult) -> String {
  let detail = match (&result.reason, &result.error) {
    (_, Some(error)) => format!("{}: {}", result.status, error),
    (Some(reason), None) => format!("{}: {}", result.status, reason),
    (None, None) => result.status.to_string(),
  };
  format!("{} {} ({})", status_symbol(result.status), result.label(), detail)
}

/// Per-item lines followed by the summary counts.
pub fn print_report(report: &ApplyReport) {
  for result in &report.results {
    println!("  {}", format_result(result));
  }
  for error in &report.hook_errors {
    print_warning(error);
  }
  if !report.results.is_empty() {
    println!();
  }

  let s = &report.summary;
  let summary = if report.dry_run {
    format!(
      "Would add {}, update {}, remove {} ({} skipped)",
      s.added, s.updated, s.removed, s.skipped
    )
  } else {
    format!(
      "{} added, {} updated, {} removed, {} skipped, {} failed",
      s.added, s.updated, s.removed, s.skipped, s.failed
    )
  };
  if s.failed > 0 {
    print_error(&summary);
  } else {
    print_success(&summary);
  }
}
