//! Config-driven metadata derivation.

use std::collections::BTreeMap;

use regex::Regex;

use crate::types::{EXTRACTOR_SOURCE_NAME, ExtractorConfig, ManagerConfigError, Metadata};

#[derive(Debug, Clone)]
struct Rule {
  field: String,
  pattern: Option<Regex>,
  group: usize,
}

/// Compiled `metadata_extractors` of one manager.
#[derive(Debug, Clone, Default)]
pub struct MetadataExtractors {
  rules: Vec<Rule>,
}

impl MetadataExtractors {
  pub fn from_config(manager: &str, config: &BTreeMap<String, ExtractorConfig>) -> Result<Self, ManagerConfigError> {
    let mut rules = Vec::with_capacity(config.len());
    for (field, extractor) in config {
      if extractor.source != EXTRACTOR_SOURCE_NAME {
        return Err(ManagerConfigError::UnknownExtractorSource {
          manager: manager.to_string(),
          field: field.clone(),
          input: extractor.source.clone(),
        });
      }
      let pattern = extractor
        .pattern
        .as_deref()
        .map(|p| {
          Regex::new(p).map_err(|source| ManagerConfigError::InvalidPattern {
            manager: manager.to_string(),
            pattern: p.to_string(),
            source,
          })
        })
        .transpose()?;
      rules.push(Rule {
        field: field.clone(),
        pattern,
        group: extractor.group.unwrap_or(1),
      });
    }
    Ok(Self { rules })
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Derive metadata fields from a package name.
  ///
  /// A rule whose pattern does not match contributes nothing.
  pub fn extract(&self, name: &str) -> Metadata {
    let mut metadata = Metadata::new();
    for rule in &self.rules {
      let value = match &rule.pattern {
        None => Some(name.to_string()),
        Some(re) => re
          .captures(name)
          .and_then(|caps| caps.get(rule.group))
          .map(|m| m.as_str().to_string()),
      };
      if let Some(value) = value {
        metadata.insert(rule.field.clone(), value.into());
      }
    }
    metadata
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn npm_style() -> MetadataExtractors {
    let mut config = BTreeMap::new();
    config.insert(
      "scope".to_string(),
      ExtractorConfig {
        pattern: Some("^(@[^/]+)/".to_string()),
        ..Default::default()
      },
    );
    config.insert("full_name".to_string(), ExtractorConfig::default());
    MetadataExtractors::from_config("npm", &config).unwrap()
  }

  #[test]
  fn splits_scoped_names() {
    let metadata = npm_style().extract("@vue/cli");
    assert_eq!(metadata["scope"], "@vue");
    assert_eq!(metadata["full_name"], "@vue/cli");
  }

  #[test]
  fn unmatched_pattern_adds_nothing() {
    let metadata = npm_style().extract("typescript");
    assert!(metadata.get("scope").is_none());
    assert_eq!(metadata["full_name"], "typescript");
  }

  #[test]
  fn explicit_group_is_used() {
    let mut config = BTreeMap::new();
    config.insert(
      "base".to_string(),
      ExtractorConfig {
        pattern: Some("^(@[^/]+/)?(.+)$".to_string()),
        group: Some(2),
        ..Default::default()
      },
    );
    let extractors = MetadataExtractors::from_config("npm", &config).unwrap();
    assert_eq!(extractors.extract("@vue/cli")["base"], "cli");
  }

  #[test]
  fn unknown_source_is_rejected() {
    let mut config = BTreeMap::new();
    config.insert(
      "x".to_string(),
      ExtractorConfig {
        source: "json".to_string(),
        ..Default::default()
      },
    );
    assert!(MetadataExtractors::from_config("npm", &config).is_err());
  }
}
