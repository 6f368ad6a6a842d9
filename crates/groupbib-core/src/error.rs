//! Error types for groupbib-core

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the record store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(String),

    /// A key lookup matched no publication
    #[error("No publication matches '{0}'")]
    NoMatch(String),

    /// A key lookup matched more than one publication
    #[error("'{fragment}' matches {count} publications, expected exactly one")]
    Ambiguous { fragment: String, count: usize },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
