//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// A package manager backed by `sh` that keeps its installed list in
/// `$HOME/fake-installed`. Installing a package named `bad` fails.
pub const FAKE_MANAGER_CONFIG: &str = r#"
managers:
  fake:
    binary: sh
    list:
      command: [sh, -c, 'cat "$HOME/fake-installed" 2>/dev/null || true']
    install:
      command: [sh, -c, 'test "$0" != bad && echo "$0" >> "$HOME/fake-installed"', "{{Package}}"]
    uninstall:
      command: [sh, -c, 'grep -vx "$0" "$HOME/fake-installed" > "$HOME/fake-tmp"; mv "$HOME/fake-tmp" "$HOME/fake-installed"', "{{Package}}"]
"#;

/// Isolated config and home directories.
pub struct TestEnv {
  pub config: TempDir,
  pub home: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      config: TempDir::new().unwrap(),
      home: TempDir::new().unwrap(),
    }
  }

  pub fn with_config(content: &str) -> Self {
    let env = Self::new();
    env.write_config("plonk.yaml", content);
    env
  }

  /// Write a file relative to the config directory.
  pub fn write_config(&self, relative_path: &str, content: &str) {
    let path = self.config.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn home_path(&self, relative_path: &str) -> PathBuf {
    self.home.path().join(relative_path)
  }

  pub fn lock_content(&self) -> String {
    std::fs::read_to_string(self.config.path().join("plonk.lock")).unwrap_or_default()
  }

  /// A `plonk` command confined to this environment.
  pub fn plonk(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("plonk");
    cmd.env("PLONK_DIR", self.config.path());
    cmd.env("HOME", self.home.path());
    cmd.env("USERPROFILE", self.home.path());
    cmd.env_remove("PLONK_LOG");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
