//! Process execution seam for package manager adapters.
//!
//! Adapters never spawn processes directly. They go through a
//! [`CommandExecutor`] handed to them at construction so tests can script
//! tool output without touching the system.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// Exit code, `None` if the process was killed by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  /// Successful output with the given stdout.
  pub fn ok(stdout: impl Into<String>) -> Self {
    Self {
      code: Some(0),
      stdout: stdout.into(),
      stderr: String::new(),
    }
  }

  /// Failed output with the given exit code and stderr.
  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      code: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }

  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  /// Stdout and stderr joined, for pattern matching and diagnostics.
  pub fn combined(&self) -> String {
    match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
      (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
      (false, true) => self.stdout.trim_end().to_string(),
      (true, false) => self.stderr.trim_end().to_string(),
      (true, true) => String::new(),
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("'{program}' was cancelled")]
  Cancelled { program: String },
}

impl ExecError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, ExecError::Cancelled { .. })
  }
}

/// Runs external commands and resolves binaries on `PATH`.
#[async_trait]
pub trait CommandExecutor: Send + Sync + fmt::Debug {
  /// Run `program` with `args` to completion, capturing output.
  ///
  /// A non-zero exit is not an error at this level. Cancelling `cancel`
  /// kills the process and yields [`ExecError::Cancelled`].
  async fn run(&self, cancel: &CancellationToken, program: &str, args: &[String]) -> Result<CommandOutput, ExecError>;

  /// Locate `binary` on `PATH`.
  fn look_path(&self, binary: &str) -> Option<PathBuf>;
}

/// Executor backed by real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

#[async_trait]
impl CommandExecutor for SystemExecutor {
  async fn run(&self, cancel: &CancellationToken, program: &str, args: &[String]) -> Result<CommandOutput, ExecError> {
    if cancel.is_cancelled() {
      return Err(ExecError::Cancelled {
        program: program.to_string(),
      });
    }

    debug!(program = %program, args = ?args, "spawning process");

    let child = Command::new(program)
      .args(args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
      })?;

    let output = tokio::select! {
      _ = cancel.cancelled() => {
        debug!(program = %program, "process cancelled");
        return Err(ExecError::Cancelled { program: program.to_string() });
      }
      output = child.wait_with_output() => output.map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
      })?,
    };

    let result = CommandOutput {
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if !result.success() {
      debug!(program = %program, code = ?result.code, stderr = %result.stderr.trim(), "process exited unsuccessfully");
    }
    Ok(result)
  }

  fn look_path(&self, binary: &str) -> Option<PathBuf> {
    which::which(binary).ok()
  }
}
