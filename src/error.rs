//! Error types for limpiar.

use std::path::PathBuf;

/// Result type alias for limpiar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in limpiar operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// CSV error during parsing or writing.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error during report serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Column not found in the document schema.
    #[error("Column '{name}' not found in schema")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },

    /// Row index out of bounds when accessing the document.
    #[error("Row index {index} out of bounds for document with {len} rows")]
    RowIndexOutOfBounds {
        /// The requested row index.
        index: usize,
        /// The actual number of rows.
        len: usize,
    },

    /// Schema mismatch between a row and the declared columns.
    #[error("Schema mismatch: {message}")]
    SchemaMismatch {
        /// Description of the schema mismatch.
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parse error.
        message: String,
    },

    /// Document has no rows or no columns.
    #[error("Document is empty")]
    EmptyDocument,

    /// Edit operation failed.
    #[error("Edit error: {message}")]
    Edit {
        /// Description of the edit error.
        message: String,
    },

    /// The compute service could not be reached (transport failure or
    /// timeout). Distinct from a service-side processing failure.
    #[error("Compute service unreachable: {message}")]
    ServiceUnavailable {
        /// Description of the transport failure.
        message: String,
    },

    /// The compute service answered but reported a processing failure.
    #[error("Compute service error: {message}")]
    Service {
        /// The error message reported by the service.
        message: String,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create a column not found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an edit error.
    pub fn edit(message: impl Into<String>) -> Self {
        Self::Edit {
            message: message.into(),
        }
    }

    /// Create a service-unreachable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Create a service-side processing error.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }
}
