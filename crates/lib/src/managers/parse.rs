//! Parsing of `list` command output into package names.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use super::{ManagerError, Operation};
use crate::types::{ListConfig, ManagerConfigError, Normalize, ParseStrategy};

/// A compiled [`ListConfig`].
#[derive(Debug, Clone)]
pub struct ListParser {
  strategy: ParseStrategy,
  field: Option<String>,
  pattern: Option<Regex>,
  normalize: Option<Normalize>,
}

impl ListParser {
  pub fn from_config(manager: &str, config: &ListConfig) -> Result<Self, ManagerConfigError> {
    let pattern = match (&config.parse, &config.pattern) {
      (ParseStrategy::Regex, Some(pattern)) => Some(Regex::new(pattern).map_err(|source| {
        ManagerConfigError::InvalidPattern {
          manager: manager.to_string(),
          pattern: pattern.clone(),
          source,
        }
      })?),
      (ParseStrategy::Regex, None) => {
        return Err(ManagerConfigError::MissingPattern {
          manager: manager.to_string(),
        });
      }
      _ => None,
    };
    Ok(Self {
      strategy: config.parse,
      field: config.field.clone().filter(|f| !f.is_empty()),
      pattern,
      normalize: config.normalize,
    })
  }

  /// Extract package names from `output`, de-duplicated in first-seen order.
  ///
  /// Blank output means nothing is installed. Output that does not have the
  /// declared shape is a parse error.
  pub fn parse(&self, manager: &str, output: &str) -> Result<Vec<String>, ManagerError> {
    if output.trim().is_empty() {
      return Ok(Vec::new());
    }

    let fail = |reason: String| ManagerError::Parse {
      manager: manager.to_string(),
      operation: Operation::List,
      reason,
    };

    let raw: Vec<String> = match self.strategy {
      ParseStrategy::Lines => output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect(),
      ParseStrategy::Json => {
        let field = self.field.as_deref().ok_or_else(|| fail("no json field configured".to_string()))?;
        let value: Value = serde_json::from_str(output).map_err(|e| fail(e.to_string()))?;
        let Value::Array(entries) = value else {
          return Err(fail("expected a JSON array".to_string()));
        };
        entries
          .iter()
          .filter_map(|entry| entry.get(field).and_then(Value::as_str))
          .map(str::to_string)
          .collect()
      }
      ParseStrategy::JsonMap => {
        let value: Value = serde_json::from_str(output).map_err(|e| fail(e.to_string()))?;
        let target = match &self.field {
          Some(field) => value.get(field).cloned().unwrap_or(Value::Null),
          None => value,
        };
        match target {
          Value::Object(map) => map.keys().cloned().collect(),
          Value::Null => Vec::new(),
          _ => return Err(fail("expected a JSON object".to_string())),
        }
      }
      ParseStrategy::Regex => {
        let pattern = self.pattern.as_ref().ok_or_else(|| fail("no pattern configured".to_string()))?;
        output
          .lines()
          .filter_map(|line| pattern.captures(line))
          .filter_map(|caps| caps.get(1))
          .map(|m| m.as_str().trim().to_string())
          .collect()
      }
    };

    let mut seen = HashSet::new();
    Ok(
      raw
        .into_iter()
        .map(|name| match self.normalize {
          Some(Normalize::Lower) => name.to_lowercase(),
          None => name,
        })
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect(),
    )
  }
}
