//! Error types shared by every layer of the catalog.
//!
//! The store and the rating aggregator never recover from a failure on their
//! own: they roll back and hand one of these variants upward, and the HTTP
//! layer turns each variant into a status code.

use thiserror::Error;

use crate::types::MovieId;

/// Errors that can occur while validating, storing, or rating movies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Malformed input (missing title, bad year, unparsable id, ...)
    #[error("{0}")]
    Validation(String),

    /// Referenced movie doesn't exist
    #[error("Movie {0} not found")]
    NotFound(MovieId),

    /// Uniqueness violation on create or update
    #[error("{0}")]
    Conflict(String),

    /// Connection could not be obtained or the transaction could not commit
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Rating is not an integer in 1..=5
    #[error("Invalid rating: {0}")]
    InvalidRating(String),
}

impl CatalogError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Validation(_) => "validation_error",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::Conflict(_) => "conflict",
            CatalogError::StoreUnavailable(_) => "store_unavailable",
            CatalogError::InvalidRating(_) => "invalid_rating",
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }
}

/// Convenience type alias for Results in the catalog crates
pub type Result<T> = std::result::Result<T, CatalogError>;
