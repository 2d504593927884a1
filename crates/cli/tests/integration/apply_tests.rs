//! Apply and status command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn apply_deploys_dotfiles() {
  let env = TestEnv::new();
  env.write_config("zshrc", "export EDITOR=vim\n");
  env.write_config("config/nvim/init.lua", "vim.o.number = true\n");

  env
    .plonk()
    .arg("apply")
    .assert()
    .success()
    .stdout(predicate::str::contains("2 added"));

  assert_eq!(std::fs::read_to_string(env.home_path(".zshrc")).unwrap(), "export EDITOR=vim\n");
  assert!(env.home_path(".config/nvim/init.lua").exists());
  assert!(env.lock_content().contains("type: dotfile"));
}

#[test]
fn apply_twice_has_nothing_to_do() {
  let env = TestEnv::new();
  env.write_config("zshrc", "a\n");
  env.plonk().arg("apply").assert().success();
  env
    .plonk()
    .arg("apply")
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to do"));
}

#[test]
fn dry_run_reports_without_changing() {
  let env = TestEnv::new();
  env.write_config("gitconfig", "[user]\n");

  env
    .plonk()
    .args(["apply", "--dry-run", "--json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"would-add\""))
    .stdout(predicate::str::contains("\"dry_run\": true"));

  assert!(!env.home_path(".gitconfig").exists());
}

#[test]
fn status_shows_drift() {
  let env = TestEnv::new();
  env.write_config("vimrc", "set number\n");
  std::fs::write(env.home_path(".vimrc"), "set nonumber\n").unwrap();

  env
    .plonk()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("vimrc (degraded)"));
}

#[cfg(unix)]
#[test]
fn failing_pre_hook_aborts() {
  let env = TestEnv::with_config("hooks:\n  pre_apply:\n    - command: exit 3\n");
  env.write_config("zshrc", "a\n");

  env
    .plonk()
    .arg("apply")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("pre-apply hook failed"));
  assert!(!env.home_path(".zshrc").exists());
}

#[cfg(unix)]
#[test]
fn tolerated_post_hook_failure_is_partial() {
  let env = TestEnv::with_config("hooks:\n  post_apply:\n    - command: exit 1\n      continue_on_error: true\n");
  env.write_config("zshrc", "a\n");

  env.plonk().arg("apply").assert().code(2);
  assert!(env.home_path(".zshrc").exists());
}
