use crate::core::errors::{Result, TandemError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Configuration shared by chains and groups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KernelConfig {
    /// Label attached to log lines and events
    #[serde(default = "default_label")]
    pub label: String,
    /// Maximum number of steps accepted by a chain
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,
    /// Maximum number of items accepted by a group
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,
    /// Level used by `init_tracing` (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_label() -> String {
    "tandem".to_string()
}

fn default_max_chain_length() -> usize {
    10_000
}

fn default_max_group_size() -> usize {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            max_chain_length: default_max_chain_length(),
            max_group_size: default_max_group_size(),
            log_level: default_log_level(),
        }
    }
}

impl KernelConfig {
    /// Validates configuration values
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(TandemError::configuration("label must not be empty"));
        }
        if self.max_chain_length == 0 {
            return Err(TandemError::configuration(
                "max_chain_length must be greater than 0",
            ));
        }
        if self.max_group_size == 0 {
            return Err(TandemError::configuration(
                "max_group_size must be greater than 0",
            ));
        }
        self.tracing_level()?;
        Ok(())
    }

    /// Parses `log_level` into a tracing level
    pub fn tracing_level(&self) -> Result<tracing::Level> {
        self.log_level.parse::<tracing::Level>().map_err(|_| {
            TandemError::configuration_field(
                "unknown log level",
                "log_level",
                "one of trace, debug, info, warn, error",
                self.log_level.clone(),
            )
        })
    }

    /// Parses and validates a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: KernelConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a YAML file
    pub fn load_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TandemError::io(format!("read {}", path.display()), e))?;
        let config = Self::from_yaml_str(&content)?;
        debug!("Loaded kernel config '{}' from {}", config.label, path.display());
        Ok(config)
    }

    /// Create a config with a different label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = KernelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracing_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = KernelConfig::from_yaml_str("label: bootstrap\nmax_chain_length: 8\n").unwrap();
        assert_eq!(
            config,
            KernelConfig {
                label: "bootstrap".to_string(),
                max_chain_length: 8,
                ..KernelConfig::default()
            }
        );
    }

    #[test]
    fn test_zero_limits_rejected() {
        let err = KernelConfig::from_yaml_str("max_group_size: 0").unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let config = KernelConfig {
            log_level: "loud".to_string(),
            ..KernelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TandemError::Configuration { field: Some(ref f), .. }) if f == "log_level"
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = KernelConfig::load_yaml_file("does/not/exist.yaml").unwrap_err();
        assert_eq!(err.category(), "io");
    }
}
