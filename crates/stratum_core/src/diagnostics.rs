//! Non-fatal problems collected over a synthesis run.

use std::fmt;

use tracing::warn;

use crate::error::CoreError;

/// Category of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Configuration,
    ContextNotFound,
    ImageReference,
    Other,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::ContextNotFound => "context",
            Self::ImageReference => "image",
            Self::Other => "other",
        };
        write!(f, "{}", label)
    }
}

/// A single warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Warnings accumulated while building layers.
///
/// Threaded explicitly through the pipeline and handed back to the caller, who
/// decides what a non-empty set means (the CLI exits non-zero).
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(Diagnostic { kind, message });
    }

    /// Record a non-fatal error as a warning of the matching kind.
    pub fn record(&mut self, error: &CoreError) {
        let kind = match error {
            CoreError::Configuration { .. } => DiagnosticKind::Configuration,
            CoreError::ContextNotFound(_) => DiagnosticKind::ContextNotFound,
            CoreError::ImageReference { .. } => DiagnosticKind::ImageReference,
            _ => DiagnosticKind::Other,
        };
        self.warn(kind, error.to_string());
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.warnings.iter().filter(|d| d.kind == kind).count()
    }
}
