//! Search error types

use crate::error::AppError;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Search-related errors
#[derive(Error, Debug)]
pub enum SearchError {
    /// Index initialization failed
    #[error("Failed to initialize search index: {0}")]
    IndexInitFailed(String),

    /// Schema error
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Query execution failed
    #[error("Search query failed: {0}")]
    QueryFailed(String),

    /// Document indexing failed
    #[error("Failed to index document: {0}")]
    IndexingFailed(String),

    /// Document deletion failed
    #[error("Failed to delete document: {0}")]
    DeletionFailed(String),

    /// Inbound document could not be normalized into an indexable product
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The engine could not be reached
    #[error("Search engine unreachable: {0}")]
    Transport(String),

    /// The engine answered with a non-success status
    #[error("Search engine returned {status}: {message}")]
    EngineResponse { status: u16, message: String },

    /// Invalid configuration
    #[error("Invalid search configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::QueryFailed(format!("Malformed engine response: {}", err))
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::InvalidDocument(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            SearchError::InvalidDocument(msg) => AppError::Validation(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}
