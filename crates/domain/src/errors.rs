//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Draft content has too little visible text
    #[error("Content too short: {actual} visible characters (minimum {min})")]
    ContentTooShort { min: usize, actual: usize },

    /// Draft content exceeds the size cap
    #[error("Content too large: {actual} bytes (maximum {max})")]
    ContentTooLarge { max: usize, actual: usize },

    /// Draft title exceeds the length cap
    #[error("Title too long: {actual} characters (maximum {max})")]
    TitleTooLong { max: usize, actual: usize },

    /// Metadata is not an object or is too large
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Inline book snapshot is unusable
    #[error("Invalid book data: {0}")]
    InvalidBookData(String),

    /// Invalid identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}
