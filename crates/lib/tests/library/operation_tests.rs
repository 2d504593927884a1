use std::sync::Arc;

use plonk_lib::config::Config;
use plonk_lib::managers::CommandOutput;
use plonk_lib::operations::{install, search, uninstall};
use plonk_lib::orchestrator::{ApplyOptions, ItemStatus, Outcome};
use tokio_util::sync::CancellationToken;

use super::common::{Sandbox, ScriptedExecutor};

#[tokio::test]
async fn installed_package_becomes_desired_state() {
  let sandbox = Sandbox::new();
  let exec = Arc::new(ScriptedExecutor::with_binaries(&["cargo"]));
  exec.respond("cargo install ripgrep", CommandOutput::ok(""));
  exec.respond("cargo install --list", CommandOutput::ok("ripgrep v14.1.0:\n    rg\n"));
  let ctx = sandbox.context(Config::default(), exec.clone());
  let cancel = CancellationToken::new();

  let report = install(&ctx, &cancel, &["cargo:ripgrep".to_string()]).await.unwrap();
  assert_eq!(report.outcome(), Outcome::Success);
  assert!(sandbox.lock_text().contains("cargo:ripgrep"));

  // Apply now sees it as managed.
  let report = ctx
    .orchestrator()
    .unwrap()
    .apply(&cancel, ApplyOptions::default())
    .await
    .unwrap();
  assert!(report.results.is_empty());

  exec.respond("cargo uninstall ripgrep", CommandOutput::ok(""));
  let report = uninstall(&ctx, &cancel, &["cargo:ripgrep".to_string()]).await.unwrap();
  assert_eq!(report.results[0].status, ItemStatus::Removed);
  assert!(!sandbox.lock_text().contains("cargo:ripgrep"));
}

#[tokio::test]
async fn search_merges_available_managers() {
  let sandbox = Sandbox::new();
  let exec = Arc::new(ScriptedExecutor::with_binaries(&["brew", "cargo"]));
  exec.respond("brew search ripgrep", CommandOutput::ok("ripgrep\nripgrep-all\n"));
  exec.respond(
    "cargo search ripgrep --limit 20",
    CommandOutput::ok("ripgrep = \"14.1.0\"    # fast grep\n"),
  );
  let ctx = sandbox.context(Config::default(), exec);

  let results = search(&ctx, &CancellationToken::new(), "ripgrep").await.unwrap();
  let managers: Vec<_> = results.iter().map(|r| r.manager.as_str()).collect();
  assert_eq!(managers, vec!["brew", "cargo"]);
  assert_eq!(results[0].packages, vec!["ripgrep", "ripgrep-all"]);
}
