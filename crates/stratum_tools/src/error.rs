//! Error types for external tool invocation.

use thiserror::Error;

/// Result type alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur while driving an external tool.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not available: {0}")]
    NotAvailable(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {exit_code}")]
    Failed { command: String, exit_code: i32 },

    #[error("Unknown container runtime: {0}")]
    UnknownRuntime(String),

    #[error(transparent)]
    Core(#[from] stratum_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Exit status of a failed tool, to be passed through as the process status.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_only_for_failures() {
        let failed = ToolError::Failed {
            command: "docker push web".to_string(),
            exit_code: 3,
        };
        assert_eq!(failed.exit_code(), Some(3));
        assert_eq!(failed.to_string(), "`docker push web` exited with status 3");

        assert_eq!(ToolError::NotAvailable("kustomize".into()).exit_code(), None);
    }
}
