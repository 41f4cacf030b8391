//! Draft storage port
//!
//! Defines the interface for persisting review drafts. The store is the
//! source of truth and the only place where the version token is compared.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{DraftId, DraftPatch, ReviewDraft, UserId};
#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use crate::error::ApplicationError;

/// Before and after images of a successful conditional write
#[derive(Debug, Clone)]
pub struct DraftChange {
    pub previous: ReviewDraft,
    pub current: ReviewDraft,
}

/// Listing parameters, page is 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftListQuery {
    pub page: u32,
    pub page_size: u32,
    pub include_abandoned: bool,
}

impl DraftListQuery {
    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// One page of stored drafts plus the total matching count
#[derive(Debug, Clone, Default)]
pub struct StoredDraftPage {
    pub items: Vec<ReviewDraft>,
    pub total: u64,
}

/// Aggregate counts over all drafts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DraftStatistics {
    pub total: u64,
    pub active: u64,
    pub abandoned: u64,
    /// Past their deadline but not yet reclaimed
    pub expired: u64,
    /// Holding an inline book snapshot without a catalog link
    pub unreconciled: u64,
}

/// Port for review draft persistence
///
/// Every write goes through a version-matched conditional write: the row is
/// only changed when `id`, `owner_id` and `version` all match, and each
/// successful write bumps `version` by exactly one and recomputes
/// `expires_at` from the store's retention window.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DraftStorePort: Send + Sync {
    /// Insert a new draft
    ///
    /// Returns `Duplicate` if the id is already taken.
    async fn create(&self, draft: &ReviewDraft) -> Result<ReviewDraft, ApplicationError>;

    /// Apply `patch` only if the stored version equals `expected_version`
    ///
    /// Returns `NotFound` for unknown, foreign or expired drafts and
    /// `VersionConflict` when the version does not match. An expired draft
    /// stays untouched until the sweep removes it.
    async fn conditional_update(
        &self,
        id: &DraftId,
        owner_id: &UserId,
        expected_version: i64,
        patch: DraftPatch,
    ) -> Result<DraftChange, ApplicationError>;

    /// Get a draft owned by `owner_id`
    async fn get(&self, id: &DraftId, owner_id: &UserId) -> Result<ReviewDraft, ApplicationError>;

    /// List a user's drafts, most recently updated first
    async fn list(
        &self,
        owner_id: &UserId,
        query: DraftListQuery,
    ) -> Result<StoredDraftPage, ApplicationError>;

    /// Mark a draft `ABANDONED` (a versioned write)
    async fn soft_delete(
        &self,
        id: &DraftId,
        owner_id: &UserId,
    ) -> Result<DraftChange, ApplicationError>;

    /// Remove a draft, returning the removed row
    async fn hard_delete(
        &self,
        id: &DraftId,
        owner_id: &UserId,
    ) -> Result<ReviewDraft, ApplicationError>;

    /// Best-effort update of `last_accessed`; does not bump the version
    async fn touch(
        &self,
        id: &DraftId,
        owner_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), ApplicationError>;

    /// Drafts whose `expires_at <= now`, oldest deadline first
    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewDraft>, ApplicationError>;

    /// Delete a draft only if it is still expired at `now`
    ///
    /// Returns `false` when the row is gone or was refreshed meanwhile.
    async fn delete_expired(&self, id: &DraftId, now: DateTime<Utc>)
    -> Result<bool, ApplicationError>;

    /// Drafts beyond each owner's `cap` most recently accessed ones
    async fn list_over_cap(&self, cap: u32, limit: u32)
    -> Result<Vec<ReviewDraft>, ApplicationError>;

    /// Live drafts with inline book data but no catalog link,
    /// most recently accessed first
    async fn list_unreconciled(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewDraft>, ApplicationError>;

    /// Aggregate counts
    async fn statistics(&self, now: DateTime<Utc>) -> Result<DraftStatistics, ApplicationError>;
}
