//! Configuration management for legal retrieval
//!
//! Supports loading configuration from:
//! - TOML files (`config/default`, `config/{env}`)
//! - Environment variables (`LEGAL_RAG__` prefix, `__` separator)
//!
//! Every tuning value has a named default in [`constants`].

pub mod constants;
pub mod settings;
pub mod telemetry;

pub use settings::{
    load_settings, load_settings_from, BoostConfig, ConfidenceConfig, ContextConfig,
    CrossReferenceConfig, ObservabilityConfig, RetrievalConfig, RuntimeEnvironment, Settings,
};
pub use telemetry::init_tracing;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(path) => ConfigError::FileNotFound(path),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}
