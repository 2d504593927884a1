use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use plonk_lib::config::Config;
use plonk_lib::context::Context;
use plonk_lib::managers::{CommandExecutor, CommandOutput, ExecError};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Answers commands from a fixed table; anything else exits 127.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
  responses: Mutex<HashMap<String, CommandOutput>>,
  binaries: HashSet<String>,
  calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
  pub fn with_binaries(binaries: &[&str]) -> Self {
    Self {
      binaries: binaries.iter().map(|b| b.to_string()).collect(),
      ..Self::default()
    }
  }

  pub fn respond(&self, line: &str, output: CommandOutput) {
    self.responses.lock().unwrap().insert(line.to_string(), output);
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
  async fn run(&self, cancel: &CancellationToken, program: &str, args: &[String]) -> Result<CommandOutput, ExecError> {
    if cancel.is_cancelled() {
      return Err(ExecError::Cancelled {
        program: program.to_string(),
      });
    }
    let line = std::iter::once(program)
      .chain(args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ");
    self.calls.lock().unwrap().push(line.clone());
    Ok(
      self
        .responses
        .lock()
        .unwrap()
        .get(&line)
        .cloned()
        .unwrap_or_else(|| CommandOutput::failed(127, format!("unexpected command: {line}"))),
    )
  }

  fn look_path(&self, binary: &str) -> Option<PathBuf> {
    self.binaries.contains(binary).then(|| PathBuf::from("/usr/bin").join(binary))
  }
}

/// A config directory and a home directory, both temporary.
pub struct Sandbox {
  pub config: TempDir,
  pub home: TempDir,
}

impl Sandbox {
  pub fn new() -> Self {
    Self {
      config: TempDir::new().unwrap(),
      home: TempDir::new().unwrap(),
    }
  }

  /// Write a dotfile source under the config directory.
  pub fn dotfile(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.config.path().join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn home_path(&self, relative: &str) -> PathBuf {
    self.home.path().join(relative)
  }

  pub fn context(&self, config: Config, exec: Arc<ScriptedExecutor>) -> Context {
    Context::new(config, self.config.path().to_path_buf(), self.home.path().to_path_buf(), exec).unwrap()
  }

  pub fn lock_text(&self) -> String {
    read(&self.config.path().join("plonk.lock"))
  }
}

pub fn read(path: &Path) -> String {
  std::fs::read_to_string(path).unwrap()
}
