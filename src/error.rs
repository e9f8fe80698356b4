//! Error types for Sommelier
//!
//! Request-path failures have their own narrow enums (`FeatureError`,
//! `PipelineError`, `PredictError`) so handlers can match on the kind.
//! `SommelierError` covers everything that can stop the server from starting
//! or serving.

use thiserror::Error;

use crate::templates::TemplateError;

/// Result type alias for Sommelier operations
pub type Result<T> = std::result::Result<T, SommelierError>;

/// Top-level error for startup and serving
#[derive(Debug, Error)]
pub enum SommelierError {
    /// Configuration values could not be turned into a runnable server
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Template environment could not be prepared or rendered
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Binding or serving the HTTP listener failed
    #[error("Server I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
