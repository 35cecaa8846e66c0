//! Orchestrator configuration
//!
//! - `WAYMARK_ROUTER_TEMPERATURE` - Sampling temperature, 0.0 to 2.0 (default: 0.1)
//! - `WAYMARK_ROUTER_MAX_TOKENS` - Completion token budget (default: 256)
//! - `WAYMARK_ROUTER_DEFAULT_PIPELINE` - Fallback pipeline named in the prompt (default: `chat_pipeline`)
//! - `WAYMARK_ROUTER_ROUTING_KEY` - JSON field carrying the decision (default: `pipeline`)

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Pipeline the model is told to pick when nothing else matches.
    pub default_pipeline: String,
    pub routing_key: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 256,
            default_pipeline: "chat_pipeline".to_string(),
            routing_key: "pipeline".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = get_env_parsed::<f32>("WAYMARK_ROUTER_TEMPERATURE")? {
            config.temperature = value;
        }
        if let Some(value) = get_env_parsed::<u32>("WAYMARK_ROUTER_MAX_TOKENS")? {
            config.max_tokens = value;
        }
        if let Ok(value) = env::var("WAYMARK_ROUTER_DEFAULT_PIPELINE") {
            config.default_pipeline = value;
        }
        if let Ok(value) = env::var("WAYMARK_ROUTER_ROUTING_KEY") {
            config.routing_key = value;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_default_pipeline(mut self, name: impl Into<String>) -> Self {
        self.default_pipeline = name.into();
        self
    }

    pub fn with_routing_key(mut self, key: impl Into<String>) -> Self {
        self.routing_key = key.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if self.default_pipeline.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default pipeline cannot be empty".to_string(),
            ));
        }
        if self.routing_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "routing key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn get_env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid value '{val}': {e}"),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.routing_key, "pipeline");
        assert_eq!(config.default_pipeline, "chat_pipeline");
    }

    #[test]
    fn test_validation() {
        assert!(OrchestratorConfig::default().with_temperature(3.5).validate().is_err());
        assert!(OrchestratorConfig::default().with_max_tokens(0).validate().is_err());
        assert!(OrchestratorConfig::default().with_routing_key("").validate().is_err());
        assert!(OrchestratorConfig::default()
            .with_default_pipeline(" ")
            .validate()
            .is_err());
    }
}
