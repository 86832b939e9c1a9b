//! Configuration for the slaide gateway.
//!
//! A config is read from YAML (with `${VAR}` interpolation), then patched
//! from well-known environment variables, then validated.

mod defaults;
mod env;
pub mod types;
mod validation;

use std::path::Path;

pub use defaults::{DISCORD_API_BASE, HOST_URL, RENDER_PATH};
pub use env::{interpolate_env, interpolate_with};
pub use types::*;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing environment variables: {0:?}")]
    MissingEnvVars(Vec<String>),

    #[error("Invalid URL for {field}: '{value}' (expected http:// or https://)")]
    InvalidUrl { field: String, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SlaideConfig {
    /// Parse a configuration from a YAML string.
    /// Environment variables in the format `${VAR_NAME}` are interpolated first.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let interpolated = env::interpolate_env(yaml)?;
        if interpolated.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&interpolated)?)
    }

    /// Load a configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load from `path` when given (defaults otherwise), apply environment
    /// overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate_or_err()?;
        Ok(config)
    }

    /// Render the configuration as YAML. Secrets are redacted.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
