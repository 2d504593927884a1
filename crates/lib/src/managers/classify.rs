//! Tool output classification.
//!
//! Package managers report "already installed" and "not installed" in wildly
//! different ways, sometimes with a zero exit code and sometimes not. Each
//! adapter describes its tool with an [`ErrorMatcher`] and routes every
//! mutating command through [`check_outcome`], so compiled and
//! config-driven adapters reach the same verdict for the same output.

use std::collections::HashMap;

use tracing::debug;

use super::{CommandOutput, ManagerError, Operation};
use crate::consts::MAX_ERROR_OUTPUT;

/// What a failed command's output means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The system is already in the requested state.
  Idempotent,
  NotFound,
  PermissionDenied,
  Other,
}

const PERMISSION_PATTERNS: [&str; 3] = ["permission denied", "access denied", "eacces"];

/// Case-insensitive substring tables for one manager.
#[derive(Debug, Clone)]
pub struct ErrorMatcher {
  idempotent: HashMap<Operation, Vec<String>>,
  not_found: Vec<String>,
  permission: Vec<String>,
}

impl Default for ErrorMatcher {
  fn default() -> Self {
    Self {
      idempotent: HashMap::new(),
      not_found: Vec::new(),
      permission: PERMISSION_PATTERNS.iter().map(|p| p.to_string()).collect(),
    }
  }
}

fn lowered<I, S>(patterns: I) -> impl Iterator<Item = String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  patterns
    .into_iter()
    .map(|p| p.as_ref().trim().to_lowercase())
    .filter(|p| !p.is_empty())
}

impl ErrorMatcher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Output fragments meaning `operation` had nothing to do.
  pub fn idempotent<I, S>(mut self, operation: Operation, patterns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.idempotent.entry(operation).or_default().extend(lowered(patterns));
    self
  }

  /// Output fragments meaning the package does not exist.
  pub fn not_found<I, S>(mut self, patterns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.not_found.extend(lowered(patterns));
    self
  }

  /// Additional output fragments meaning the tool lacked privileges.
  pub fn permission<I, S>(mut self, patterns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.permission.extend(lowered(patterns));
    self
  }

  pub fn classify(&self, operation: Operation, output: &str) -> ErrorKind {
    let haystack = output.to_lowercase();
    let hit = |patterns: &[String]| patterns.iter().any(|p| haystack.contains(p.as_str()));

    if self.idempotent.get(&operation).is_some_and(|p| hit(p)) {
      ErrorKind::Idempotent
    } else if hit(&self.not_found) {
      ErrorKind::NotFound
    } else if hit(&self.permission) {
      ErrorKind::PermissionDenied
    } else {
      ErrorKind::Other
    }
  }
}

/// Decide whether a mutating command reached the requested state.
///
/// - A zero exit, or output matching the operation's idempotent patterns, succeeds.
/// - An uninstall of an unknown package succeeds since it is already absent.
/// - Otherwise the failure is mapped to a typed error carrying truncated output.
pub fn check_outcome(
  manager: &str,
  operation: Operation,
  package: &str,
  output: &CommandOutput,
  matcher: &ErrorMatcher,
) -> Result<(), ManagerError> {
  if output.success() {
    return Ok(());
  }

  let combined = output.combined();
  match matcher.classify(operation, &combined) {
    ErrorKind::Idempotent => {
      debug!(manager, package, operation = %operation, "already in requested state");
      Ok(())
    }
    ErrorKind::NotFound if operation == Operation::Uninstall => {
      debug!(manager, package, "package unknown to manager, treating as absent");
      Ok(())
    }
    ErrorKind::NotFound => Err(ManagerError::PackageNotFound {
      manager: manager.to_string(),
      package: package.to_string(),
    }),
    ErrorKind::PermissionDenied => Err(ManagerError::PermissionDenied {
      manager: manager.to_string(),
      operation,
      package: package.to_string(),
      output: truncate(&combined, MAX_ERROR_OUTPUT),
    }),
    ErrorKind::Other => Err(ManagerError::CommandFailed {
      manager: manager.to_string(),
      operation,
      package: package.to_string(),
      code: output.code,
      output: truncate(&combined, MAX_ERROR_OUTPUT),
    }),
  }
}

/// Cut `text` to at most `max` characters, marking the cut.
pub fn truncate(text: &str, max: usize) -> String {
  let text = text.trim();
  match text.char_indices().nth(max) {
    Some((idx, _)) => format!("{}...", &text[..idx]),
    None => text.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn matcher() -> ErrorMatcher {
    ErrorMatcher::new()
      .idempotent(Operation::Install, ["already installed"])
      .idempotent(Operation::Uninstall, ["is not installed"])
      .not_found(["No available formula"])
  }

  mod classification {
    use super::*;

    #[test]
    fn patterns_are_case_insensitive() {
      assert_eq!(
        matcher().classify(Operation::Install, "Warning: jq ALREADY INSTALLED"),
        ErrorKind::Idempotent
      );
      assert_eq!(
        matcher().classify(Operation::Install, "Error: no available formula with the name \"x\""),
        ErrorKind::NotFound
      );
    }

    #[test]
    fn idempotent_patterns_are_per_operation() {
      assert_eq!(
        matcher().classify(Operation::Uninstall, "already installed"),
        ErrorKind::Other
      );
    }

    #[test]
    fn permission_defaults_apply() {
      assert_eq!(
        matcher().classify(Operation::Install, "EACCES: permission denied, mkdir"),
        ErrorKind::PermissionDenied
      );
    }

    #[test]
    fn blank_patterns_never_match() {
      let m = ErrorMatcher::new().not_found(["", "  "]);
      assert_eq!(m.classify(Operation::Install, "anything"), ErrorKind::Other);
    }
  }

  mod outcomes {
    use super::*;

    #[test]
    fn success_exit_is_ok() {
      assert!(check_outcome("brew", Operation::Install, "jq", &CommandOutput::ok(""), &matcher()).is_ok());
    }

    #[test]
    fn idempotent_failure_is_ok() {
      let output = CommandOutput::failed(1, "Error: jq 1.7 is already installed");
      assert!(check_outcome("brew", Operation::Install, "jq", &output, &matcher()).is_ok());
    }

    #[test]
    fn uninstall_of_unknown_package_is_ok() {
      let output = CommandOutput::failed(1, "Error: No available formula with the name \"nope\"");
      assert!(check_outcome("brew", Operation::Uninstall, "nope", &output, &matcher()).is_ok());
    }

    #[test]
    fn install_of_unknown_package_is_not_found() {
      let output = CommandOutput::failed(1, "Error: No available formula with the name \"nope\"");
      let err = check_outcome("brew", Operation::Install, "nope", &output, &matcher()).unwrap_err();
      assert!(matches!(err, ManagerError::PackageNotFound { ref package, .. } if package == "nope"));
    }

    #[test]
    fn other_failure_carries_truncated_output() {
      let noisy = "x".repeat(2000);
      let output = CommandOutput::failed(2, noisy);
      let err = check_outcome("brew", Operation::Install, "jq", &output, &matcher()).unwrap_err();
      match err {
        ManagerError::CommandFailed { code, output, package, .. } => {
          assert_eq!(code, Some(2));
          assert_eq!(package, "jq");
          assert_eq!(output.chars().count(), MAX_ERROR_OUTPUT + 3);
        }
        other => panic!("unexpected error: {other}"),
      }
    }
  }

  #[test]
  fn truncate_respects_char_boundaries() {
    assert_eq!(truncate("héllo", 2), "hé...");
    assert_eq!(truncate("short", 10), "short");
  }
}
