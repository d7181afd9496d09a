//! Synchronizer configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a [`WorkflowView`](crate::WorkflowView)
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// maintain_table = false
/// log_item_payloads = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Keep the flat task table alongside the tree
    pub maintain_table: bool,
    /// Append a reload suggestion to alert messages
    pub reload_hint: bool,
    /// Include the raw record in per-item failure logs
    pub log_item_payloads: bool,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With flat task table on or off
    #[inline]
    #[must_use]
    pub fn with_table(mut self, maintain: bool) -> Self {
        self.maintain_table = maintain;
        self
    }

    /// With reload hint on or off
    #[inline]
    #[must_use]
    pub fn with_reload_hint(mut self, hint: bool) -> Self {
        self.reload_hint = hint;
        self
    }

    /// With raw records in failure logs on or off
    #[inline]
    #[must_use]
    pub fn with_item_payloads(mut self, log: bool) -> Self {
        self.log_item_payloads = log;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error on invalid TOML or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            maintain_table: true,
            reload_hint: true,
            log_item_payloads: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str("maintain_table = false").unwrap();
        assert!(!config.maintain_table);
        assert!(config.reload_hint);
        assert!(!config.log_item_payloads);
    }

    #[test]
    fn unknown_key_rejected() {
        let err = SyncConfig::from_toml_str("maintain_tables = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "reload_hint = false\nlog_item_payloads = true").unwrap();

        let config = SyncConfig::load(file.path()).unwrap();
        assert_eq!(
            config,
            SyncConfig::new().with_reload_hint(false).with_item_payloads(true)
        );
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SyncConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
