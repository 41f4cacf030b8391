//! Review draft entity with optimistic-concurrency version token

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::book::BookSnapshot;
use crate::{
    content::ContentLimits,
    errors::DomainError,
    value_objects::{BookId, DraftId, DraftStatus, UserId},
};

/// Default retention window for drafts (30 days)
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Version assigned to a freshly created draft
pub const INITIAL_VERSION: i64 = 1;

/// Validated payload handed over by the request boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftInput {
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Explicit catalog link chosen by the user
    #[serde(default)]
    pub book_id: Option<BookId>,
    /// Inline snapshot of a book that may not be in the catalog yet
    #[serde(default)]
    pub book_data: Option<BookSnapshot>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl DraftInput {
    /// Create an input holding only content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_book_id(mut self, book_id: BookId) -> Self {
        self.book_id = Some(book_id);
        self
    }

    #[must_use]
    pub fn with_book_data(mut self, book_data: BookSnapshot) -> Self {
        self.book_data = Some(book_data);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Enforce content, title, metadata and book snapshot rules
    pub fn check(&self, limits: &ContentLimits) -> Result<(), DomainError> {
        limits.check_content(&self.content)?;
        limits.check_title(self.title.as_deref())?;
        limits.check_metadata(self.metadata.as_ref())?;
        if let Some(book_data) = &self.book_data {
            book_data.check()?;
        }
        Ok(())
    }
}

/// Field changes applied by a conditional update
///
/// `None` leaves a field untouched. For nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftPatch {
    pub content: Option<String>,
    pub title: Option<Option<String>>,
    pub book_id: Option<Option<BookId>>,
    pub book_data: Option<Option<BookSnapshot>>,
    pub metadata: Option<Option<Value>>,
    pub status: Option<DraftStatus>,
}

impl DraftPatch {
    /// Full replacement from a save payload; reactivates abandoned drafts
    pub fn from_input(input: DraftInput) -> Self {
        Self {
            content: Some(input.content),
            title: Some(input.title),
            book_id: Some(input.book_id),
            book_data: Some(input.book_data),
            metadata: Some(input.metadata),
            status: Some(DraftStatus::Draft),
        }
    }

    /// Link the draft to a catalog record, keeping the snapshot as history
    pub fn link_book(book_id: BookId) -> Self {
        Self {
            book_id: Some(Some(book_id)),
            ..Self::default()
        }
    }

    /// Soft delete
    pub fn abandon() -> Self {
        Self {
            status: Some(DraftStatus::Abandoned),
            ..Self::default()
        }
    }
}

/// A user's in-progress review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub id: DraftId,
    /// Owner, immutable after creation
    pub owner_id: UserId,
    pub content: String,
    pub title: Option<String>,
    /// Canonical catalog link; `None` means not yet reconciled
    pub book_id: Option<BookId>,
    /// Inline book snapshot, historical once `book_id` is set
    pub book_data: Option<BookSnapshot>,
    pub metadata: Option<Value>,
    pub status: DraftStatus,
    /// Optimistic-concurrency token, +1 per successful write
    pub version: i64,
    pub expires_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewDraft {
    /// Create a new draft at version 1
    pub fn create(
        owner_id: UserId,
        input: DraftInput,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Self {
        Self {
            id: DraftId::new(),
            owner_id,
            content: input.content,
            title: input.title,
            book_id: input.book_id,
            book_data: input.book_data,
            metadata: input.metadata,
            status: DraftStatus::Draft,
            version: INITIAL_VERSION,
            expires_at: now + retention,
            last_accessed: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Use a caller-chosen identifier
    #[must_use]
    pub fn with_id(mut self, id: DraftId) -> Self {
        self.id = id;
        self
    }

    /// Produce the next version of this draft
    ///
    /// Bumps `version` by one, stamps `updated_at`/`last_accessed` and
    /// recomputes `expires_at` from `now`. Ownership never changes.
    #[must_use]
    pub fn apply(&self, patch: DraftPatch, now: DateTime<Utc>, retention: Duration) -> Self {
        let mut next = self.clone();
        if let Some(content) = patch.content {
            next.content = content;
        }
        if let Some(title) = patch.title {
            next.title = title;
        }
        if let Some(book_id) = patch.book_id {
            next.book_id = book_id;
        }
        if let Some(book_data) = patch.book_data {
            next.book_data = book_data;
        }
        if let Some(metadata) = patch.metadata {
            next.metadata = metadata;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        next.version = self.version + 1;
        next.updated_at = now;
        next.last_accessed = now;
        next.expires_at = now + retention;
        next
    }

    /// Whether the draft is past its deadline at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whole days left before expiry, rounded up, never negative
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        let remaining = self.expires_at - now;
        if remaining <= Duration::zero() {
            return 0;
        }
        let days = remaining.num_days();
        if remaining > Duration::days(days) {
            days + 1
        } else {
            days
        }
    }

    /// Holds an inline snapshot but no catalog link yet
    pub fn needs_reconciliation(&self) -> bool {
        self.book_id.is_none() && self.book_data.is_some()
    }

    pub fn is_abandoned(&self) -> bool {
        self.status == DraftStatus::Abandoned
    }
}
