//! Test utilities for plonk-lib.
//!
//! Scripted stand-ins for external processes so adapter and orchestrator
//! tests never touch a real package manager.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::managers::{CommandExecutor, CommandOutput, ExecError};
use crate::orchestrator::{HookError, HookRunner, HookSpec};

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Executor that answers from a script keyed by the full command line.
///
/// Responses queue per command line; the last one repeats. Unscripted
/// commands exit 127.
#[derive(Debug, Default)]
pub struct FakeExecutor {
  responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
  binaries: Mutex<HashSet<String>>,
  delays: Mutex<HashMap<String, Duration>>,
  calls: Mutex<Vec<String>>,
}

impl FakeExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make `binary` resolvable on the fake `PATH`.
  pub fn with_binary(self, binary: &str) -> Self {
    self.binaries.lock().unwrap().insert(binary.to_string());
    self
  }

  /// Queue `output` for `command_line` (program and args joined by spaces).
  pub fn respond(&self, command_line: &str, output: CommandOutput) -> &Self {
    self
      .responses
      .lock()
      .unwrap()
      .entry(command_line.to_string())
      .or_default()
      .push_back(output);
    self
  }

  /// Make every invocation of `program` take `delay`.
  pub fn delay(&self, program: &str, delay: Duration) -> &Self {
    self.delays.lock().unwrap().insert(program.to_string(), delay);
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self, command_line: &str) -> usize {
    self.calls.lock().unwrap().iter().filter(|c| *c == command_line).count()
  }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
  async fn run(&self, cancel: &CancellationToken, program: &str, args: &[String]) -> Result<CommandOutput, ExecError> {
    let line = std::iter::once(program.to_string())
      .chain(args.iter().cloned())
      .collect::<Vec<_>>()
      .join(" ");
    self.calls.lock().unwrap().push(line.clone());

    let delay = self.delays.lock().unwrap().get(program).copied();
    if let Some(delay) = delay {
      tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
      }
    }
    if cancel.is_cancelled() {
      return Err(ExecError::Cancelled {
        program: program.to_string(),
      });
    }

    let mut responses = self.responses.lock().unwrap();
    let output = match responses.get_mut(&line) {
      Some(queue) if queue.len() > 1 => queue.pop_front(),
      Some(queue) => queue.front().cloned(),
      None => None,
    };
    Ok(output.unwrap_or_else(|| CommandOutput::failed(127, format!("unexpected command: {}", line))))
  }

  fn look_path(&self, binary: &str) -> Option<PathBuf> {
    self
      .binaries
      .lock()
      .unwrap()
      .contains(binary)
      .then(|| PathBuf::from("/usr/bin").join(binary))
  }
}

/// Hook runner that records commands and fails the ones it is told to.
#[derive(Debug, Default)]
pub struct FakeHookRunner {
  failing: HashSet<String>,
  ran: Mutex<Vec<String>>,
}

impl FakeHookRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make `command` exit 1.
  pub fn fail(mut self, command: &str) -> Self {
    self.failing.insert(command.to_string());
    self
  }

  pub fn ran(&self) -> Vec<String> {
    self.ran.lock().unwrap().clone()
  }
}

#[async_trait]
impl HookRunner for FakeHookRunner {
  async fn run(&self, cancel: &CancellationToken, hook: &HookSpec) -> Result<(), HookError> {
    if cancel.is_cancelled() {
      return Err(HookError::Cancelled {
        command: hook.command.clone(),
      });
    }
    self.ran.lock().unwrap().push(hook.command.clone());
    if self.failing.contains(&hook.command) {
      return Err(HookError::Failed {
        command: hook.command.clone(),
        code: Some(1),
        output: String::new(),
      });
    }
    Ok(())
  }
}
