//! Package commands against a shell-backed manager declared in config.
#![cfg(unix)]

use predicates::prelude::*;

use super::common::{FAKE_MANAGER_CONFIG, TestEnv};

#[test]
fn partial_install_exits_two() {
  let env = TestEnv::with_config(FAKE_MANAGER_CONFIG);

  env
    .plonk()
    .args(["install", "fake:good", "fake:bad"])
    .assert()
    .code(2)
    .stdout(predicate::str::contains("fake:good (added)"))
    .stdout(predicate::str::contains("fake:bad (failed"));

  let lock = env.lock_content();
  assert!(lock.contains("fake:good"));
  assert!(!lock.contains("fake:bad"));
}

#[test]
fn installed_package_is_managed_then_removed() {
  let env = TestEnv::with_config(FAKE_MANAGER_CONFIG);
  env.plonk().args(["install", "fake:jq"]).assert().success();

  env
    .plonk()
    .args(["status", "--json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"managed\": 1"));

  env
    .plonk()
    .args(["uninstall", "fake:jq"])
    .assert()
    .success()
    .stdout(predicate::str::contains("fake:jq (removed)"));
  assert!(!env.lock_content().contains("fake:jq"));
}

#[test]
fn apply_reinstalls_missing_package() {
  let env = TestEnv::with_config(FAKE_MANAGER_CONFIG);
  env.plonk().args(["install", "fake:fd"]).assert().success();
  std::fs::remove_file(env.home_path("fake-installed")).unwrap();

  env
    .plonk()
    .arg("apply")
    .assert()
    .success()
    .stdout(predicate::str::contains("fake:fd (added)"));
  assert!(std::fs::read_to_string(env.home_path("fake-installed")).unwrap().contains("fd"));
}

#[test]
fn all_failed_exits_one() {
  let env = TestEnv::with_config(FAKE_MANAGER_CONFIG);
  env.plonk().args(["install", "fake:bad"]).assert().code(1);
}
