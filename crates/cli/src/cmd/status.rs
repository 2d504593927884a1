//! Status command implementation.
//!
//! Shows the reconciled state of every domain without changing anything.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use plonk_lib::orchestrator::DomainStatus;
use plonk_lib::types::{Domain, ItemState};

use crate::output::{print_json, print_stat, print_success, symbols};

pub fn cmd_status(verbose: bool, json: bool) -> Result<i32> {
  let ctx = super::load_context()?;
  let orchestrator = ctx.orchestrator().context("Failed to prepare status")?;
  let statuses =
    super::run(|cancel| async move { orchestrator.reconcile(&cancel).await.context("Failed to read state") })?;

  if json {
    print_json(&statuses)?;
    return Ok(0);
  }

  for (i, status) in statuses.iter().enumerate() {
    if i > 0 {
      println!();
    }
    print_domain(status, verbose);
  }
  Ok(0)
}

fn print_domain(status: &DomainStatus, verbose: bool) {
  let title = match status.domain {
    Domain::Package => "Packages",
    Domain::Dotfile => "Dotfiles",
  };
  let s = &status.summary;
  if s.is_converged() {
    print_success(&format!("{}: {} managed", title, s.managed));
  } else {
    println!("{}", title.if_supports_color(Stream::Stdout, |t| t.bold()));
  }
  print_stat("Managed", &s.managed.to_string());
  print_stat("Missing", &s.missing.to_string());
  print_stat("Degraded", &s.degraded.to_string());
  print_stat("Untracked", &s.untracked.to_string());

  for item in &status.items {
    let symbol = match item.state {
      ItemState::Missing => symbols::ADD,
      ItemState::Degraded => symbols::MODIFY,
      ItemState::Untracked if verbose => symbols::INFO,
      ItemState::Managed if verbose => symbols::SUCCESS,
      _ => continue,
    };
    let label = if item.manager.is_empty() {
      item.name.clone()
    } else {
      format!("{}:{}", item.manager, item.name)
    };
    println!("    {} {} ({})", symbol, label, item.state);
  }
}
