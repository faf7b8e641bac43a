//! Error types for the core module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while synthesizing layers.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error in {path}: {message}")]
    Configuration { path: PathBuf, message: String },

    #[error("Context not found in configuration: {0}")]
    ContextNotFound(String),

    #[error("Application contract violated: {0}")]
    ResourceContract(String),

    #[error("Invalid image reference `{reference}`: {message}")]
    ImageReference { reference: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CoreError {
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ResourceContract(message.into())
    }

    pub fn image(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ImageReference {
            reference: reference.into(),
            message: message.into(),
        }
    }
}
