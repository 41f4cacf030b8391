//! Application-level errors
//!
//! These are the outcomes the request boundary maps to transport status
//! codes. Client errors are distinguishable from transient store failures
//! so callers know whether to fix input, refetch, or retry.

use domain::{DomainError, DraftId};
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error (content rules, identifiers)
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Input rejected before any store access
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown id, or owned by someone else
    #[error("Not found: {0}")]
    NotFound(String),

    /// The stored version no longer matches the caller's expected version
    #[error("Version conflict on draft {draft_id}: expected version {expected}")]
    VersionConflict { draft_id: DraftId, expected: i64 },

    /// A record with the same unique key already exists
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Storage is busy or unreachable
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A bounded operation did not finish in time
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApplicationError::StoreUnavailable(_) | ApplicationError::Timeout(_)
        )
    }

    /// Check if this error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApplicationError::VersionConflict { .. })
    }

    /// Check if the caller caused this error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApplicationError::Domain(_)
                | ApplicationError::Validation(_)
                | ApplicationError::NotFound(_)
                | ApplicationError::VersionConflict { .. }
                | ApplicationError::Duplicate(_)
        )
    }

    /// Not-found error for a draft
    pub fn draft_not_found(id: &DraftId) -> Self {
        ApplicationError::NotFound(format!("draft {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(ApplicationError::StoreUnavailable("busy".into()).is_retryable());
        assert!(ApplicationError::Timeout("save".into()).is_retryable());
        assert!(!ApplicationError::Validation("short".into()).is_retryable());
    }

    #[test]
    fn conflict_is_a_client_error() {
        let err = ApplicationError::VersionConflict {
            draft_id: DraftId::new(),
            expected: 1,
        };
        assert!(err.is_conflict());
        assert!(err.is_client_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn domain_errors_are_client_errors() {
        let err: ApplicationError = DomainError::ContentTooShort { min: 10, actual: 9 }.into();
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "Content too short: 9 visible characters (minimum 10)"
        );
    }

    #[test]
    fn not_found_message_names_draft() {
        let id = DraftId::new();
        assert_eq!(
            ApplicationError::draft_not_found(&id).to_string(),
            format!("Not found: draft {id}")
        );
    }
}
