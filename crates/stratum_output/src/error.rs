//! Error types for output sinks.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Errors that can occur while writing a layer tree.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Invalid output path {path}: {message}")]
    InvalidPath { path: PathBuf, message: String },

    #[error("Failed to write layer `{layer}`: {source}")]
    Layer {
        layer: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist archive: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
