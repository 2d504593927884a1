use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder tokens replaced by the package name when a command is rendered.
pub const PACKAGE_PLACEHOLDERS: [&str; 2] = ["{{Package}}", "{{.Package}}"];

/// Declarative description of a package manager.
///
/// Built-in managers ship one of these, and user configuration can override
/// fields or declare entirely new managers. The generic adapter needs
/// nothing else to drive a manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
  #[serde(default)]
  pub binary: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub install_hint: String,
  /// Optional availability probe run after the binary is found on `PATH`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub available: Option<CommandConfig>,
  #[serde(default)]
  pub list: ListConfig,
  #[serde(default)]
  pub install: CommandConfig,
  #[serde(default)]
  pub uninstall: CommandConfig,
  #[serde(default)]
  pub upgrade: CommandConfig,
  #[serde(default)]
  pub upgrade_all: CommandConfig,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub metadata_extractors: BTreeMap<String, ExtractorConfig>,
}

/// A command template plus the output fragments that mean "already done".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
  #[serde(default)]
  pub command: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub idempotent_errors: Vec<String>,
}

impl CommandConfig {
  pub fn new<I, S>(command: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      command: command.into_iter().map(Into::into).collect(),
      idempotent_errors: Vec::new(),
    }
  }

  pub fn with_idempotent<I, S>(mut self, patterns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.idempotent_errors = patterns.into_iter().map(Into::into).collect();
    self
  }

  pub fn is_empty(&self) -> bool {
    self.command.is_empty()
  }
}

/// How the output of the `list` command is turned into package names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrategy {
  /// First whitespace-delimited token of every non-empty line.
  #[default]
  Lines,
  /// A named string field from every element of a top-level JSON array.
  Json,
  /// Keys of a top-level JSON object, or of the object under `field`.
  #[serde(rename = "json_map", alias = "json-map")]
  JsonMap,
  /// Capture group 1 of `pattern`, applied line by line.
  Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalize {
  Lower,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListConfig {
  #[serde(default)]
  pub command: Vec<String>,
  #[serde(default)]
  pub parse: ParseStrategy,
  #[serde(default, alias = "json_field", skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pattern: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub normalize: Option<Normalize>,
}

/// Derives one metadata field from an installed package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractorConfig {
  /// Input to the extractor. Only `name` (the package name) is supported.
  #[serde(default = "default_extractor_source")]
  pub source: String,
  /// Regex applied to the source. Without one the source is copied verbatim.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pattern: Option<String>,
  /// Capture group to keep, defaulting to 1.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub group: Option<usize>,
}

pub const EXTRACTOR_SOURCE_NAME: &str = "name";

fn default_extractor_source() -> String {
  EXTRACTOR_SOURCE_NAME.to_string()
}

impl Default for ExtractorConfig {
  fn default() -> Self {
    Self {
      source: default_extractor_source(),
      pattern: None,
      group: None,
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ManagerConfigError {
  #[error("manager '{manager}' has no binary")]
  MissingBinary { manager: String },

  #[error("manager '{manager}' has no {operation} command")]
  MissingCommand { manager: String, operation: &'static str },

  #[error("manager '{manager}' uses json list parsing but sets no field")]
  MissingJsonField { manager: String },

  #[error("manager '{manager}' uses regex list parsing but sets no pattern")]
  MissingPattern { manager: String },

  #[error("manager '{manager}' has an invalid pattern '{pattern}': {source}")]
  InvalidPattern {
    manager: String,
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("manager '{manager}' pattern '{pattern}' has no capture group {group}")]
  MissingCaptureGroup {
    manager: String,
    pattern: String,
    group: usize,
  },

  #[error("manager '{manager}' extractor '{field}' reads unknown source '{input}'")]
  UnknownExtractorSource {
    manager: String,
    field: String,
    input: String,
  },
}

impl ManagerConfig {
  /// Overlay `over` onto `self`. Non-empty fields of `over` win.
  ///
  /// The list section is replaced as a whole when `over` names a list
  /// command, since the parse settings describe that command's output.
  pub fn merge(&self, over: &ManagerConfig) -> ManagerConfig {
    fn pick_cmd(base: &CommandConfig, over: &CommandConfig) -> CommandConfig {
      if over.is_empty() { base.clone() } else { over.clone() }
    }
    fn pick_str(base: &str, over: &str) -> String {
      if over.is_empty() { base.to_string() } else { over.to_string() }
    }

    let mut extractors = self.metadata_extractors.clone();
    extractors.extend(over.metadata_extractors.clone());

    ManagerConfig {
      binary: pick_str(&self.binary, &over.binary),
      description: pick_str(&self.description, &over.description),
      install_hint: pick_str(&self.install_hint, &over.install_hint),
      available: over.available.clone().or_else(|| self.available.clone()),
      list: if over.list.command.is_empty() {
        self.list.clone()
      } else {
        over.list.clone()
      },
      install: pick_cmd(&self.install, &over.install),
      uninstall: pick_cmd(&self.uninstall, &over.uninstall),
      upgrade: pick_cmd(&self.upgrade, &over.upgrade),
      upgrade_all: pick_cmd(&self.upgrade_all, &over.upgrade_all),
      metadata_extractors: extractors,
    }
  }

  /// Check that the generic adapter can drive this configuration.
  pub fn validate(&self, manager: &str) -> Result<(), ManagerConfigError> {
    let owned = || manager.to_string();
    if self.binary.trim().is_empty() {
      return Err(ManagerConfigError::MissingBinary { manager: owned() });
    }
    for (operation, cmd) in [
      ("list", &self.list.command),
      ("install", &self.install.command),
      ("uninstall", &self.uninstall.command),
    ] {
      if cmd.is_empty() {
        return Err(ManagerConfigError::MissingCommand {
          manager: owned(),
          operation,
        });
      }
    }

    match self.list.parse {
      ParseStrategy::Json if self.list.field.as_deref().is_none_or(str::is_empty) => {
        return Err(ManagerConfigError::MissingJsonField { manager: owned() });
      }
      ParseStrategy::Regex => {
        let pattern = self
          .list
          .pattern
          .as_deref()
          .ok_or_else(|| ManagerConfigError::MissingPattern { manager: owned() })?;
        check_pattern(manager, pattern, 1)?;
      }
      _ => {}
    }

    for (field, extractor) in &self.metadata_extractors {
      if extractor.source != EXTRACTOR_SOURCE_NAME {
        return Err(ManagerConfigError::UnknownExtractorSource {
          manager: owned(),
          field: field.clone(),
          input: extractor.source.clone(),
        });
      }
      if let Some(pattern) = &extractor.pattern {
        check_pattern(manager, pattern, extractor.group.unwrap_or(1))?;
      }
    }
    Ok(())
  }
}

fn check_pattern(manager: &str, pattern: &str, group: usize) -> Result<Regex, ManagerConfigError> {
  let re = Regex::new(pattern).map_err(|source| ManagerConfigError::InvalidPattern {
    manager: manager.to_string(),
    pattern: pattern.to_string(),
    source,
  })?;
  if group >= re.captures_len() {
    return Err(ManagerConfigError::MissingCaptureGroup {
      manager: manager.to_string(),
      pattern: pattern.to_string(),
      group,
    });
  }
  Ok(re)
}

/// Substitute `package` into a command template.
///
/// Returns the program and its arguments. A template without any
/// placeholder gets the package appended as the final argument. With an
/// empty package, tokens that were only a placeholder are dropped.
pub fn render_command(template: &[String], package: &str) -> Option<(String, Vec<String>)> {
  if template.is_empty() {
    return None;
  }
  let mut substituted = false;
  let mut tokens = Vec::with_capacity(template.len() + 1);
  for token in template {
    let mut out = token.clone();
    for placeholder in PACKAGE_PLACEHOLDERS {
      if out.contains(placeholder) {
        out = out.replace(placeholder, package);
        substituted = true;
      }
    }
    if out.is_empty() && !token.is_empty() {
      continue;
    }
    tokens.push(out);
  }
  if !substituted && !package.is_empty() {
    tokens.push(package.to_string());
  }
  let mut iter = tokens.into_iter();
  let program = iter.next()?;
  Some((program, iter.collect()))
}
