//! `plonk install`, `plonk uninstall` and `plonk upgrade`.
//!
//! Each acts on the named packages right away and records the result in the
//! lock file, so a later `plonk apply` sees the same state.

use anyhow::{Context, Result};

use plonk_lib::operations::{install, uninstall, upgrade};
use plonk_lib::orchestrator::ApplyReport;

use crate::output::{print_info, print_json, print_report};

fn finish(report: ApplyReport, json: bool) -> Result<i32> {
  if json {
    print_json(&report)?;
  } else if report.results.is_empty() {
    print_info("No managed packages to act on");
  } else {
    print_report(&report);
  }
  Ok(report.outcome().exit_code())
}

pub fn cmd_install(specs: Vec<String>, json: bool) -> Result<i32> {
  let ctx = super::load_context()?;
  let report = super::run(|cancel| async move { install(&ctx, &cancel, &specs).await.context("Install failed") })?;
  finish(report, json)
}

pub fn cmd_uninstall(specs: Vec<String>, json: bool) -> Result<i32> {
  let ctx = super::load_context()?;
  let report =
    super::run(|cancel| async move { uninstall(&ctx, &cancel, &specs).await.context("Uninstall failed") })?;
  finish(report, json)
}

/// With no specs every managed package is upgraded.
pub fn cmd_upgrade(specs: Vec<String>, json: bool) -> Result<i32> {
  let ctx = super::load_context()?;
  let report = super::run(|cancel| async move { upgrade(&ctx, &cancel, &specs).await.context("Upgrade failed") })?;
  finish(report, json)
}
