use crate::error::ChunkflowError;
use serde::{Deserialize, Serialize};

/// Connection settings for a remote model endpoint
///
/// Passed opaquely to the HTTP transport; the core only checks whether an
/// API key is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Full endpoint URL (e.g. "http://localhost:1234/v1/chat/completions")
    pub endpoint: String,

    /// Optional bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ConnectionSettings {
    /// Create new connection settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    /// Attach an API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Validate connection settings
    pub fn validate(&self) -> Result<(), ChunkflowError> {
        if self.endpoint.is_empty() {
            return Err(ChunkflowError::invalid_configuration(
                "Endpoint cannot be empty",
            ));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ChunkflowError::invalid_configuration(
                "Endpoint must start with http:// or https://",
            ));
        }

        Ok(())
    }
}

/// Model settings shared by both pipelines
///
/// Immutable once a pipeline has been constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model name (e.g. "meta-llama-3.1-8b-instruct")
    pub model_name: String,

    /// Context window size in tokens
    pub max_tokens: u32,

    /// Fraction of the window reserved for the response (chat only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_ratio: Option<f64>,
}

impl ModelSettings {
    /// Create new model settings without a response ratio
    pub fn new(model_name: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model_name: model_name.into(),
            max_tokens,
            response_ratio: None,
        }
    }

    /// Set the response ratio
    pub fn with_response_ratio(mut self, ratio: f64) -> Self {
        self.response_ratio = Some(ratio);
        self
    }

    /// Validate model settings
    pub fn validate(&self) -> Result<(), ChunkflowError> {
        if self.model_name.is_empty() {
            return Err(ChunkflowError::invalid_configuration(
                "Model name cannot be empty",
            ));
        }

        if self.max_tokens == 0 {
            return Err(ChunkflowError::invalid_configuration(
                "max_tokens must be greater than 0",
            ));
        }

        if let Some(ratio) = self.response_ratio {
            if !(0.0 < ratio && ratio < 1.0) {
                return Err(ChunkflowError::invalid_configuration(format!(
                    "response_ratio must be between 0 and 1. Got: {}",
                    ratio
                )));
            }
        }

        Ok(())
    }
}

/// Chunkflow application configuration (CLI surface)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model endpoint URL
    pub endpoint: String,

    /// API key for the endpoint
    pub api_key: Option<String>,

    /// Model name
    pub model_name: String,

    /// Context window size in tokens
    pub max_tokens: u32,

    /// Response reservation ratio (chat mode)
    pub response_ratio: Option<f64>,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:1234/v1/chat/completions".to_string(),
            api_key: None,
            model_name: "meta-llama-3.1-8b-instruct".to_string(),
            max_tokens: 2048,
            response_ratio: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, ChunkflowError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let config = Self {
            endpoint: std::env::var("CHUNKFLOW_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:1234/v1/chat/completions".to_string()),
            api_key: std::env::var("CHUNKFLOW_API_KEY").ok(),
            model_name: std::env::var("CHUNKFLOW_MODEL")
                .unwrap_or_else(|_| "meta-llama-3.1-8b-instruct".to_string()),
            max_tokens: std::env::var("CHUNKFLOW_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2048),
            response_ratio: std::env::var("CHUNKFLOW_RESPONSE_RATIO")
                .ok()
                .and_then(|s| s.parse().ok()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Connection settings for the configured endpoint
    pub fn connection(&self) -> ConnectionSettings {
        ConnectionSettings {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
        }
    }

    /// Model settings for the configured model
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model_name: self.model_name.clone(),
            max_tokens: self.max_tokens,
            response_ratio: self.response_ratio,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ChunkflowError> {
        self.connection().validate()?;
        self.model_settings().validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_settings_validate() {
        let settings = ModelSettings::new("mock_chat_model", 200).with_response_ratio(0.3);
        assert!(settings.validate().is_ok());

        let empty_name = ModelSettings::new("", 200);
        assert!(empty_name.validate().is_err());

        let zero_tokens = ModelSettings::new("mock_chat_model", 0);
        assert!(zero_tokens.validate().is_err());
    }

    #[test]
    fn test_model_settings_invalid_ratio() {
        let too_high = ModelSettings::new("mock_chat_model", 200).with_response_ratio(1.5);
        assert!(too_high.validate().is_err());

        let at_one = ModelSettings::new("mock_chat_model", 200).with_response_ratio(1.0);
        assert!(at_one.validate().is_err());

        let at_zero = ModelSettings::new("mock_chat_model", 200).with_response_ratio(0.0);
        assert!(at_zero.validate().is_err());
    }

    #[test]
    fn test_connection_settings_validate() {
        let settings = ConnectionSettings::new("http://mock.endpoint").with_api_key("mock_key");
        assert!(settings.validate().is_ok());

        let bad_scheme = ConnectionSettings::new("ftp://mock.endpoint");
        assert!(bad_scheme.validate().is_err());

        let empty = ConnectionSettings::new("");
        assert!(empty.validate().is_err());
    }
}
