//! Error handling for filtergraph-rs
//!
//! Each layer has its own error enum (`GraphError`, `ExpressionError`,
//! `SweepError`); this module gathers them into one crate-wide type and a
//! Result alias for callers that drive several layers at once.

use crate::expression::ExpressionError;
use crate::pipeline::error::GraphError;
use crate::state_space::SweepError;
use thiserror::Error;

/// Main error type for filtergraph-rs operations
#[derive(Error, Debug)]
pub enum FilterGraphError {
    /// Registry, graph, planning and execution errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Expression compilation errors
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// State-space definition errors
    #[error("Sweep error: {0}")]
    Sweep(#[from] SweepError),

    /// Errors related to Rhai program compilation or execution
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FilterGraphError>,
    },
}

impl FilterGraphError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FilterGraphError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        FilterGraphError::Script(err.to_string())
    }

    /// The innermost error, skipping context wrappers.
    pub fn root_cause(&self) -> &FilterGraphError {
        match self {
            FilterGraphError::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for FilterGraphError {
    fn from(err: serde_json::Error) -> Self {
        FilterGraphError::Serialization(err.to_string())
    }
}

impl From<Box<rhai::EvalAltResult>> for FilterGraphError {
    fn from(err: Box<rhai::EvalAltResult>) -> Self {
        FilterGraphError::from_rhai_error(err)
    }
}

/// Result type alias for filtergraph-rs operations
pub type Result<T> = std::result::Result<T, FilterGraphError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FilterGraphError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FilterGraphError::Graph(GraphError::UnknownNode("d0".to_string()));
        assert_eq!(err.to_string(), "Graph error: Unknown node 'd0'");
    }

    #[test]
    fn test_error_with_context() {
        let result: std::result::Result<(), GraphError> = Err(GraphError::NoTerminal);
        let err = result.context("Failed to run 'main'").unwrap_err();
        assert!(err.to_string().starts_with("Failed to run 'main'"));
        assert!(matches!(
            err.root_cause(),
            FilterGraphError::Graph(GraphError::NoTerminal)
        ));
    }

    #[test]
    fn test_lazy_context() {
        let result: std::result::Result<(), SweepError> = Err(SweepError::InvalidAxis {
            axis: "t".into(),
            reason: "size must be positive".into(),
        });
        let err = result.with_context(|| "sweep".to_string()).unwrap_err();
        assert!(err.to_string().contains("sweep"));
    }
}
