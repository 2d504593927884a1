//! Command plumbing shared by every adapter.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::classify::{ErrorMatcher, check_outcome, truncate};
use super::{CommandExecutor, CommandOutput, ManagerError, Operation};
use crate::consts::MAX_ERROR_OUTPUT;

/// One external tool: its executor, binary and error tables.
#[derive(Debug, Clone)]
pub struct Tool {
  pub manager: String,
  pub binary: String,
  pub exec: Arc<dyn CommandExecutor>,
  pub matcher: ErrorMatcher,
}

/// Build an owned argument vector.
pub fn argv(parts: &[&str]) -> Vec<String> {
  parts.iter().map(|p| p.to_string()).collect()
}

impl Tool {
  pub fn new(manager: &str, binary: &str, exec: Arc<dyn CommandExecutor>, matcher: ErrorMatcher) -> Self {
    Self {
      manager: manager.to_string(),
      binary: binary.to_string(),
      exec,
      matcher,
    }
  }

  pub fn on_path(&self) -> bool {
    self.exec.look_path(&self.binary).is_some()
  }

  /// Run `argv` (program first) and capture its output.
  pub async fn run(
    &self,
    cancel: &CancellationToken,
    operation: Operation,
    argv: &[String],
  ) -> Result<CommandOutput, ManagerError> {
    let Some((program, args)) = argv.split_first() else {
      return Err(ManagerError::Unsupported {
        manager: self.manager.clone(),
        operation,
      });
    };
    debug!(manager = %self.manager, operation = %operation, args = ?args, "running manager command");
    self
      .exec
      .run(cancel, program, args)
      .await
      .map_err(|e| ManagerError::from_exec(&self.manager, operation, e))
  }

  /// Run a state-changing command and classify its outcome.
  pub async fn mutate(
    &self,
    cancel: &CancellationToken,
    operation: Operation,
    package: &str,
    argv: &[String],
  ) -> Result<(), ManagerError> {
    let output = self.run(cancel, operation, argv).await?;
    check_outcome(&self.manager, operation, package, &output, &self.matcher)
  }

  /// Run a read-only query, failing on a non-zero exit.
  pub async fn query(
    &self,
    cancel: &CancellationToken,
    operation: Operation,
    package: &str,
    argv: &[String],
  ) -> Result<CommandOutput, ManagerError> {
    let output = self.run(cancel, operation, argv).await?;
    if output.success() {
      Ok(output)
    } else {
      Err(self.failure(operation, package, &output))
    }
  }

  pub fn failure(&self, operation: Operation, package: &str, output: &CommandOutput) -> ManagerError {
    ManagerError::CommandFailed {
      manager: self.manager.clone(),
      operation,
      package: package.to_string(),
      code: output.code,
      output: truncate(&output.combined(), MAX_ERROR_OUTPUT),
    }
  }

  pub fn parse_error(&self, operation: Operation, reason: impl Into<String>) -> ManagerError {
    ManagerError::Parse {
      manager: self.manager.clone(),
      operation,
      reason: reason.into(),
    }
  }
}
