//! Port for the draft audit trail
//!
//! The trail is append-only: nothing in this system updates or deletes
//! records once written.

use async_trait::async_trait;
use domain::{DraftAuditRecord, DraftId};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for audit record persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DraftAuditLogPort: Send + Sync {
    /// Append a record, returning its insertion-ordered id
    async fn append(&self, record: &DraftAuditRecord) -> Result<i64, ApplicationError>;

    /// All records for a draft in insertion order
    async fn for_draft(&self, draft_id: &DraftId)
    -> Result<Vec<DraftAuditRecord>, ApplicationError>;

    /// The most recent records, newest first
    async fn recent(&self, limit: u32) -> Result<Vec<DraftAuditRecord>, ApplicationError>;
}
