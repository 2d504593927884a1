use std::sync::Arc;

use plonk_lib::config::Config;
use plonk_lib::lock::{LockError, LockStore};
use plonk_lib::managers::CommandOutput;
use plonk_lib::orchestrator::{ApplyError, ApplyOptions};
use tokio_util::sync::CancellationToken;

use super::common::{Sandbox, ScriptedExecutor};

const V1_LOCK: &str = "\
version: 1
packages:
  brew:
    - name: jq
      version: \"1.6\"
  npm:
    - name: prettier
";

#[tokio::test]
async fn legacy_lock_drives_apply_and_is_upgraded_on_write() {
  let sandbox = Sandbox::new();
  std::fs::write(sandbox.config.path().join("plonk.lock"), V1_LOCK).unwrap();

  let exec = Arc::new(ScriptedExecutor::with_binaries(&["brew", "npm"]));
  exec.respond("brew list -1", CommandOutput::ok("jq\n"));
  exec.respond("npm list -g --depth=0 --json", CommandOutput::ok(r#"{"dependencies":{}}"#));
  exec.respond("npm install -g prettier", CommandOutput::ok(""));
  let ctx = sandbox.context(Config::default(), exec);

  let report = ctx
    .orchestrator()
    .unwrap()
    .apply(&CancellationToken::new(), ApplyOptions::default())
    .await
    .unwrap();
  assert_eq!(report.summary.added, 1);

  let record = LockStore::in_dir(sandbox.config.path()).read().unwrap().unwrap();
  assert_eq!(record.version, 2);
  assert!(record.packages.is_empty());
  let ids: Vec<_> = record.resources.iter().map(|r| r.id.as_str()).collect();
  assert!(ids.contains(&"brew:jq"));
  assert!(ids.contains(&"npm:prettier"));
}

#[tokio::test]
async fn unsupported_lock_version_aborts_apply() {
  let sandbox = Sandbox::new();
  std::fs::write(sandbox.config.path().join("plonk.lock"), "version: 9\nresources: []\n").unwrap();
  let ctx = sandbox.context(Config::default(), Arc::new(ScriptedExecutor::default()));

  let err = ctx.orchestrator().unwrap_err();
  assert!(err.to_string().contains('9'), "{err}");

  let store = LockStore::in_dir(sandbox.config.path());
  assert!(matches!(store.read(), Err(LockError::UnsupportedVersion(9))));
}

#[tokio::test]
async fn corrupt_lock_is_a_fatal_apply_error() {
  let sandbox = Sandbox::new();
  let ctx = sandbox.context(Config::default(), Arc::new(ScriptedExecutor::default()));
  let orchestrator = ctx.orchestrator().unwrap();

  std::fs::write(sandbox.config.path().join("plonk.lock"), "resources: [").unwrap();
  let err = orchestrator
    .apply(&CancellationToken::new(), ApplyOptions::default())
    .await
    .unwrap_err();
  assert!(matches!(err, ApplyError::Lock(LockError::Parse(_))), "{err}");
}
