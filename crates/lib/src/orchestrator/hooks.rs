//! Pre/post apply hooks.
//!
//! A hook is a shell command with a timeout. A failing hook aborts the
//! phase unless it is marked `continue_on_error`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::consts::{DEFAULT_HOOK_TIMEOUT, MAX_ERROR_OUTPUT};
use crate::managers::classify::truncate;
use crate::managers::{CommandExecutor, ExecError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookSpec {
  pub command: String,
  /// Humantime string such as `30s` or `10m`.
  #[serde(default = "default_timeout", with = "humantime_duration")]
  pub timeout: Duration,
  #[serde(default)]
  pub continue_on_error: bool,
}

impl HookSpec {
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
      timeout: DEFAULT_HOOK_TIMEOUT,
      continue_on_error: false,
    }
  }
}

fn default_timeout() -> Duration {
  DEFAULT_HOOK_TIMEOUT
}

mod humantime_duration {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HooksConfig {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub pre_apply: Vec<HookSpec>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub post_apply: Vec<HookSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
  PreApply,
  PostApply,
}

impl fmt::Display for HookPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      HookPhase::PreApply => "pre-apply",
      HookPhase::PostApply => "post-apply",
    })
  }
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
  #[error("hook '{command}' failed (exit code {code:?}): {output}")]
  Failed {
    command: String,
    code: Option<i32>,
    output: String,
  },

  #[error("hook '{command}' timed out after {timeout:?}")]
  Timeout { command: String, timeout: Duration },

  #[error("hook '{command}' was cancelled")]
  Cancelled { command: String },

  #[error("failed to run hook '{command}': {source}")]
  Spawn {
    command: String,
    #[source]
    source: ExecError,
  },
}

impl HookError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, HookError::Cancelled { .. })
  }
}

/// Executes one hook.
#[async_trait]
pub trait HookRunner: Send + Sync {
  async fn run(&self, cancel: &CancellationToken, hook: &HookSpec) -> Result<(), HookError>;
}

/// Runs hooks through the platform shell.
#[derive(Debug, Clone)]
pub struct ShellHookRunner {
  exec: Arc<dyn CommandExecutor>,
}

impl ShellHookRunner {
  pub fn new(exec: Arc<dyn CommandExecutor>) -> Self {
    Self { exec }
  }
}

#[cfg(unix)]
fn shell(command: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), command.to_string()])
}

#[cfg(windows)]
fn shell(command: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), command.to_string()])
}

#[async_trait]
impl HookRunner for ShellHookRunner {
  async fn run(&self, cancel: &CancellationToken, hook: &HookSpec) -> Result<(), HookError> {
    let (program, args) = shell(&hook.command);
    let output = match tokio::time::timeout(hook.timeout, self.exec.run(cancel, program, &args)).await {
      Err(_) => {
        return Err(HookError::Timeout {
          command: hook.command.clone(),
          timeout: hook.timeout,
        });
      }
      Ok(Err(err)) if err.is_cancelled() => {
        return Err(HookError::Cancelled {
          command: hook.command.clone(),
        });
      }
      Ok(Err(source)) => {
        return Err(HookError::Spawn {
          command: hook.command.clone(),
          source,
        });
      }
      Ok(Ok(output)) => output,
    };

    if output.success() {
      Ok(())
    } else {
      Err(HookError::Failed {
        command: hook.command.clone(),
        code: output.code,
        output: truncate(&output.combined(), MAX_ERROR_OUTPUT),
      })
    }
  }
}

/// Run every hook of a phase in order.
///
/// Returns messages for failures tolerated through `continue_on_error`. The
/// first intolerable failure stops the phase and is returned as the error.
pub async fn run_phase(
  runner: &dyn HookRunner,
  cancel: &CancellationToken,
  phase: HookPhase,
  hooks: &[HookSpec],
) -> Result<Vec<String>, HookError> {
  let mut tolerated = Vec::new();
  for hook in hooks {
    info!(phase = %phase, command = %hook.command, "running hook");
    match runner.run(cancel, hook).await {
      Ok(()) => {}
      Err(err) if hook.continue_on_error && !err.is_cancelled() => {
        warn!(phase = %phase, error = %err, "hook failed, continuing");
        tolerated.push(err.to_string());
      }
      Err(err) => return Err(err),
    }
  }
  Ok(tolerated)
}
