//! Experiment configuration
//!
//! Everything has a default matching the production landing page; a TOML
//! file may override any subset.

use crate::error::ConfigError;
use crate::storage::StorageKeys;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default export file name
pub const DEFAULT_EXPORT_FILE_NAME: &str = "mergeguard-experiment-export.json";

/// Default confirmation shown after a waitlist submit
pub const DEFAULT_CONFIRMATION: &str =
    "Request saved. We will contact you for pilot qualification.";

/// Query parameter names that force a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideParams {
    /// Pricing override parameter
    pub pricing: String,
    /// Messaging override parameter
    pub messaging: String,
}

impl Default for OverrideParams {
    fn default() -> Self {
        Self {
            pricing: "variant".to_string(),
            messaging: "message".to_string(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Names of the persisted records
    pub storage_keys: StorageKeys,
    /// Override parameter names
    pub override_params: OverrideParams,
    /// Export artifact file name
    pub export_file_name: String,
    /// Status text after a successful submit
    pub confirmation_message: String,
    /// Whether a valid override also becomes the sticky assignment
    pub persist_override: bool,
}

impl ExperimentConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With storage keys
    #[inline]
    #[must_use]
    pub fn with_storage_keys(mut self, keys: StorageKeys) -> Self {
        self.storage_keys = keys;
        self
    }

    /// With sticky overrides
    #[inline]
    #[must_use]
    pub fn with_persist_override(mut self, persist: bool) -> Self {
        self.persist_override = persist;
        self
    }

    /// With export file name
    #[inline]
    #[must_use]
    pub fn with_export_file_name(mut self, name: impl Into<String>) -> Self {
        self.export_file_name = name.into();
        self
    }

    /// Parse from TOML; missing fields keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject storage keys that collide
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.storage_keys.first_duplicate() {
            Some(key) => Err(ConfigError::DuplicateStorageKey(key.to_string())),
            None => Ok(()),
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            storage_keys: StorageKeys::default(),
            override_params: OverrideParams::default(),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            confirmation_message: DEFAULT_CONFIRMATION.to_string(),
            persist_override: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ExperimentConfig::from_toml_str("").unwrap(), ExperimentConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            persist_override = true
            export_file_name = "spring.json"

            [storage_keys]
            events = "spring_events"

            [override_params]
            pricing = "plan"
            "#,
        )
        .unwrap();

        assert!(config.persist_override);
        assert_eq!(config.export_file_name, "spring.json");
        assert_eq!(config.storage_keys.events, "spring_events");
        assert_eq!(config.storage_keys.metrics, "mergeguard_metrics");
        assert_eq!(config.override_params.pricing, "plan");
        assert_eq!(config.override_params.messaging, "message");
        assert_eq!(config.confirmation_message, DEFAULT_CONFIRMATION);
    }

    #[test]
    fn colliding_keys_rejected() {
        let err = ExperimentConfig::from_toml_str(
            r#"
            [storage_keys]
            submissions = "mergeguard_events"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStorageKey(k) if k == "mergeguard_events"));
    }

    #[test]
    fn unknown_types_rejected() {
        assert!(matches!(
            ExperimentConfig::from_toml_str("persist_override = \"yes\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.toml");
        std::fs::write(&path, "confirmation_message = \"Thanks!\"").unwrap();

        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.confirmation_message, "Thanks!");

        assert!(matches!(
            ExperimentConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
