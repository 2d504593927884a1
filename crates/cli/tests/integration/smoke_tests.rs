//! Every command parses and fails cleanly on bad input.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn help_lists_commands() {
  TestEnv::new()
    .plonk()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("apply"))
    .stdout(predicate::str::contains("status"))
    .stdout(predicate::str::contains("install"));
}

#[test]
fn version_flag() {
  TestEnv::new()
    .plonk()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("plonk"));
}

#[test]
fn install_requires_a_package() {
  TestEnv::new().plonk().arg("install").assert().failure();
}

#[test]
fn invalid_config_is_fatal() {
  TestEnv::with_config("default_manger: brew\n")
    .plonk()
    .arg("status")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn unknown_manager_fails_the_item() {
  TestEnv::new()
    .plonk()
    .args(["install", "zypper:htop"])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("unsupported package manager: zypper"));
}

#[test]
fn verbose_logs_go_to_stderr() {
  TestEnv::new()
    .plonk()
    .args(["--verbose", "status", "--json"])
    .assert()
    .success()
    .stdout(predicate::str::starts_with("["))
    .stderr(predicate::str::contains("DEBUG"));
}
