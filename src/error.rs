//! # Error Types
//!
//! Hard failures of the folio library. Recoverable problems (binding misses,
//! transform failures, missing required fields during preview) are reported
//! as diagnostics next to a best-effort result instead.

use thiserror::Error;

/// Main error type for folio operations
#[derive(Debug, Error)]
pub enum FolioError {
    /// Template or data document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Template parsed but violates a structural rule
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Final render refused because required contract fields are empty
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    /// A partial includes itself, directly or through other partials
    #[error("Cyclic partial reference: {0}")]
    CyclicPartial(String),

    /// Storage lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage rejected the request
    #[error("Store error: {0}")]
    Store(String),

    /// Rasterizer collaborator failed
    #[error("Render error: {0}")]
    Render(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Parse(err.to_string())
    }
}
