//! Workflow Configuration Module
//!
//! Thresholds and model hyperparameters for the aftersales workflow, loaded
//! from a TOML file with built-in defaults. Unlike a process-global config,
//! the loaded value is injected explicitly into the executor at construction
//! time and stays read-only for its lifetime.
//!
//! ## Loading Order
//!
//! 1. `AFTERSENSE_CONFIG` environment variable (path to TOML file)
//! 2. `workflow.toml` in the current working directory
//! 3. Built-in defaults

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Hyperparameters and threshold for the LSTM anomaly detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of numeric telemetry features per timestep.
    pub input_dim: usize,
    /// Hidden state width shared by encoder and decoder layers.
    pub hidden_dim: usize,
    /// Stacked LSTM layers in each of encoder and decoder.
    pub num_layers: usize,
    /// Adam base learning rate.
    pub learning_rate: f64,
    /// Training epochs over the full window set.
    pub epochs: usize,
    /// Per-feature reconstruction error above which a metric is anomalous.
    pub anomaly_threshold: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_dim: 4,
            hidden_dim: 32,
            num_layers: 1,
            learning_rate: 1e-3,
            epochs: 10,
            anomaly_threshold: 0.05,
        }
    }
}

/// Workflow-wide configuration knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Anomaly model hyperparameters.
    pub model: ModelConfig,
    /// Severity at or above this maps to `medium`.
    pub medium_severity_threshold: f64,
    /// Severity at or above this maps to `high`.
    pub high_severity_threshold: f64,
    /// Segment label applied when ingestion supplies none.
    pub default_user_segment: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            medium_severity_threshold: 0.4,
            high_severity_threshold: 0.7,
            default_user_segment: "retail".to_string(),
        }
    }
}

impl WorkflowConfig {
    /// Load configuration following the documented loading order, falling
    /// back to defaults when no file is present. A file that exists but
    /// fails to parse or validate is an error, never silently defaulted.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("AFTERSENSE_CONFIG") {
            return Self::from_file(&path);
        }
        let default_path = Path::new("workflow.toml");
        if default_path.exists() {
            return Self::from_file("workflow.toml");
        }
        info!("no workflow.toml found - using built-in defaults");
        Ok(Self::default())
    }

    /// Load and validate configuration from a specific TOML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        info!(path, "workflow config loaded");
        Ok(config)
    }

    /// Validate threshold and dimension invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.input_dim == 0 {
            return Err(ConfigError::Invalid("model.input_dim must be > 0".into()));
        }
        if self.model.hidden_dim == 0 {
            return Err(ConfigError::Invalid("model.hidden_dim must be > 0".into()));
        }
        if self.model.num_layers == 0 {
            return Err(ConfigError::Invalid("model.num_layers must be > 0".into()));
        }
        if !(self.model.anomaly_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "model.anomaly_threshold must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.medium_severity_threshold)
            || !(0.0..=1.0).contains(&self.high_severity_threshold)
        {
            return Err(ConfigError::Invalid(
                "severity thresholds must lie in [0, 1]".into(),
            ));
        }
        if self.medium_severity_threshold >= self.high_severity_threshold {
            warn!(
                medium = self.medium_severity_threshold,
                high = self.high_severity_threshold,
                "medium severity threshold >= high - medium band is empty"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = WorkflowConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.model.input_dim, 4);
        assert_eq!(cfg.model.hidden_dim, 32);
        assert!((cfg.model.anomaly_threshold - 0.05).abs() < 1e-12);
        assert_eq!(cfg.default_user_segment, "retail");
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "high_severity_threshold = 0.8\n[model]\nanomaly_threshold = 0.1"
        )
        .expect("write");

        let cfg = WorkflowConfig::from_file(file.path().to_str().expect("utf8 path"))
            .expect("load config");
        assert!((cfg.high_severity_threshold - 0.8).abs() < 1e-12);
        assert!((cfg.model.anomaly_threshold - 0.1).abs() < 1e-12);
        // Untouched fields keep defaults
        assert!((cfg.medium_severity_threshold - 0.4).abs() < 1e-12);
        assert_eq!(cfg.model.hidden_dim, 32);
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        let cfg = WorkflowConfig {
            model: ModelConfig {
                input_dim: 0,
                ..ModelConfig::default()
            },
            ..WorkflowConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let cfg = WorkflowConfig {
            medium_severity_threshold: 1.5,
            ..WorkflowConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
