use std::sync::Arc;

use plonk_lib::config::Config;
use plonk_lib::lock::LockStore;
use plonk_lib::managers::CommandOutput;
use plonk_lib::orchestrator::{ApplyError, ApplyOptions, HookSpec, ItemStatus, Outcome};
use plonk_lib::types::{Domain, ItemState};
use tokio_util::sync::CancellationToken;

use super::common::{Sandbox, ScriptedExecutor, read};

fn brew() -> Arc<ScriptedExecutor> {
  Arc::new(ScriptedExecutor::with_binaries(&["brew"]))
}

#[tokio::test]
async fn status_covers_both_domains() {
  let sandbox = Sandbox::new();
  sandbox.dotfile("zshrc", "export EDITOR=vim\n");
  sandbox.dotfile("config/git/config", "[user]\n");
  LockStore::in_dir(sandbox.config.path())
    .add_package("brew", "jq", "1.7")
    .unwrap();

  let exec = brew();
  exec.respond("brew list -1", CommandOutput::ok("jq\nfiglet\n"));
  let ctx = sandbox.context(Config::default(), exec);

  let statuses = ctx
    .orchestrator()
    .unwrap()
    .reconcile(&CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(statuses.len(), 2);

  let packages = &statuses[0];
  assert_eq!(packages.domain, Domain::Package);
  assert_eq!((packages.summary.managed, packages.summary.untracked), (1, 1));

  let dotfiles = &statuses[1];
  assert_eq!(dotfiles.domain, Domain::Dotfile);
  assert_eq!(dotfiles.summary.missing, 2);
  assert!(dotfiles.items.iter().all(|i| i.name != "plonk.lock"));
}

#[tokio::test]
async fn apply_converges_and_records_everything() {
  let sandbox = Sandbox::new();
  sandbox.dotfile("zshrc", "export EDITOR=vim\n");
  LockStore::in_dir(sandbox.config.path())
    .add_package("brew", "jq", "")
    .unwrap();

  let exec = brew();
  exec.respond("brew list -1", CommandOutput::ok(""));
  exec.respond("brew install jq", CommandOutput::ok(""));
  exec.respond("brew list --versions jq", CommandOutput::ok("jq 1.7.1\n"));
  let ctx = sandbox.context(Config::default(), exec.clone());

  let report = ctx
    .orchestrator()
    .unwrap()
    .apply(&CancellationToken::new(), ApplyOptions::default())
    .await
    .unwrap();
  assert_eq!(report.summary.added, 2);
  assert_eq!(report.outcome(), Outcome::Success);

  assert_eq!(read(&sandbox.home_path(".zshrc")), "export EDITOR=vim\n");
  let lock = sandbox.lock_text();
  assert!(lock.contains("version: 2"));
  assert!(lock.contains("1.7.1"));
  assert!(lock.contains("type: dotfile"));

  // Converged: a second pass has nothing to do.
  exec.respond("brew list -1", CommandOutput::ok("jq\n"));
  let report = ctx
    .orchestrator()
    .unwrap()
    .apply(&CancellationToken::new(), ApplyOptions::default())
    .await
    .unwrap();
  assert!(report.results.is_empty());
}

#[tokio::test]
async fn drifted_dotfile_is_restored() {
  let sandbox = Sandbox::new();
  sandbox.dotfile("vimrc", "set number\n");
  std::fs::write(sandbox.home_path(".vimrc"), "set nonumber\n").unwrap();
  let ctx = sandbox.context(Config::default(), brew());
  let orchestrator = ctx.orchestrator().unwrap();

  let statuses = orchestrator.reconcile(&CancellationToken::new()).await.unwrap();
  assert_eq!(statuses[1].items[0].state, ItemState::Degraded);

  let report = orchestrator
    .apply(&CancellationToken::new(), ApplyOptions::default())
    .await
    .unwrap();
  assert_eq!(report.results[0].status, ItemStatus::Updated);
  assert_eq!(read(&sandbox.home_path(".vimrc")), "set number\n");
}

#[tokio::test]
async fn ignored_sources_are_not_deployed() {
  let sandbox = Sandbox::new();
  sandbox.dotfile("zshrc", "a\n");
  sandbox.dotfile("zshrc.swp", "b\n");
  sandbox.dotfile(".git/HEAD", "ref\n");
  let ctx = sandbox.context(Config::default(), brew());

  let statuses = ctx
    .orchestrator()
    .unwrap()
    .reconcile(&CancellationToken::new())
    .await
    .unwrap();
  let names: Vec<_> = statuses[1].items.iter().map(|i| i.name.as_str()).collect();
  assert_eq!(names, vec!["zshrc"]);
}

#[cfg(unix)]
#[tokio::test]
async fn failing_pre_hook_aborts_before_any_change() {
  let sandbox = Sandbox::new();
  sandbox.dotfile("zshrc", "a\n");
  let mut config = Config::default();
  config.hooks.pre_apply.push(HookSpec::new("exit 1"));

  let exec = brew();
  let ctx = sandbox.context(config, exec.clone());
  let err = ctx
    .orchestrator()
    .unwrap()
    .apply(&CancellationToken::new(), ApplyOptions::default())
    .await
    .unwrap_err();

  assert!(matches!(err, ApplyError::PreHook(_)), "{err}");
  assert!(!sandbox.home_path(".zshrc").exists());
  assert_eq!(exec.calls(), vec!["/bin/sh -c exit 1"]);
}

#[cfg(unix)]
#[tokio::test]
async fn hooks_run_around_apply() {
  let sandbox = Sandbox::new();
  sandbox.dotfile("zshrc", "a\n");
  let mut config = Config::default();
  config.hooks.pre_apply.push(HookSpec::new("echo pre"));
  config.hooks.post_apply.push(HookSpec::new("echo post"));

  let exec = brew();
  exec.respond("/bin/sh -c echo pre", CommandOutput::ok("pre\n"));
  exec.respond("/bin/sh -c echo post", CommandOutput::ok("post\n"));
  let ctx = sandbox.context(config, exec.clone());
  let report = ctx
    .orchestrator()
    .unwrap()
    .apply(&CancellationToken::new(), ApplyOptions::default())
    .await
    .unwrap();

  assert_eq!(report.outcome(), Outcome::Success);
  let calls = exec.calls();
  assert_eq!(calls.first().map(String::as_str), Some("/bin/sh -c echo pre"));
  assert_eq!(calls.last().map(String::as_str), Some("/bin/sh -c echo post"));
}

#[tokio::test]
async fn dry_run_leaves_home_untouched() {
  let sandbox = Sandbox::new();
  sandbox.dotfile("zshrc", "a\n");
  let ctx = sandbox.context(Config::default(), brew());
  let report = ctx
    .orchestrator()
    .unwrap()
    .apply(
      &CancellationToken::new(),
      ApplyOptions {
        dry_run: true,
        ..Default::default()
      },
    )
    .await
    .unwrap();

  assert_eq!(report.results[0].status, ItemStatus::WouldAdd);
  assert!(!sandbox.home_path(".zshrc").exists());
  assert!(!sandbox.config.path().join("plonk.lock").exists());
}
