//! Registry configuration.
//!
//! # Invariants
//! - Unknown configuration keys are rejected instead of ignored.
//! - Disabled ids are trimmed; blank entries are dropped.

use crate::extension::validate::ValidationPolicy;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Aggregation-time policy for the extension registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Payload validation applied by `ExtensionRegistry::load`.
    #[serde(default)]
    pub validation: ValidationPolicy,
    /// `properties.id` values whose extensions are skipped at load.
    #[serde(default)]
    pub disabled_ids: BTreeSet<String>,
}

/// Configuration read/parse errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read registry config `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("registry config is invalid: {0}")]
    Parse(#[from] serde_json::Error),
}

impl RegistryConfig {
    pub fn strict() -> Self {
        Self {
            validation: ValidationPolicy::Strict,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Adds one disabled id. Blank values are ignored.
    pub fn disable(mut self, id: &str) -> Self {
        let id = id.trim();
        if !id.is_empty() {
            self.disabled_ids.insert(id.to_string());
        }
        self
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled_ids.contains(id)
    }

    fn normalized(mut self) -> Self {
        self.disabled_ids = self
            .disabled_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RegistryConfig};
    use crate::extension::validate::ValidationPolicy;
    use std::io::Write;

    #[test]
    fn defaults_to_lenient_with_nothing_disabled() {
        let config = RegistryConfig::from_json_str("{}").expect("empty config");
        assert_eq!(config.validation, ValidationPolicy::Lenient);
        assert!(config.disabled_ids.is_empty());
    }

    #[test]
    fn parses_policy_and_trims_disabled_ids() {
        let config = RegistryConfig::from_json_str(
            r#"{ "validation": "strict", "disabled_ids": [" import-from-git ", "  "] }"#,
        )
        .expect("config should parse");
        assert_eq!(config.validation, ValidationPolicy::Strict);
        assert!(config.is_disabled("import-from-git"));
        assert_eq!(config.disabled_ids.len(), 1);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = RegistryConfig::from_json_str(r#"{ "hot_reload": true }"#)
            .expect_err("unknown key must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn reads_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "disabled_ids": ["deploy-image"] }}"#).expect("write config");
        let config = RegistryConfig::from_path(file.path()).expect("config from file");
        assert!(config.is_disabled("deploy-image"));

        let missing = RegistryConfig::from_path(&file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
