//! Implementation of the `plonk apply` command.
//!
//! Converges packages and dotfiles towards the lock file and config
//! directory, running the configured hooks around the pass.

use std::time::Instant;

use anyhow::{Context, Result};

use plonk_lib::orchestrator::ApplyOptions;

use crate::output::{format_duration, print_info, print_json, print_report};

pub fn cmd_apply(dry_run: bool, prune: bool, json: bool) -> Result<i32> {
  let ctx = super::load_context()?;
  let orchestrator = ctx.orchestrator().context("Failed to prepare apply")?;
  let options = ApplyOptions {
    dry_run,
    prune_untracked: prune,
  };

  let started = Instant::now();
  let report = super::run(|cancel| async move { orchestrator.apply(&cancel, options).await.context("Apply failed") })?;

  if json {
    print_json(&report)?;
  } else if report.results.is_empty() && report.hook_errors.is_empty() {
    print_info("Nothing to do, everything is up to date");
  } else {
    print_report(&report);
    print_info(&format!("Finished in {}", format_duration(started.elapsed())));
  }
  Ok(report.outcome().exit_code())
}
