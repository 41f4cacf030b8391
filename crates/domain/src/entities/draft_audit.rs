//! Append-only audit record for draft mutations

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::review_draft::ReviewDraft;
use crate::{
    errors::DomainError,
    value_objects::{BookId, DraftId, UserId},
};

/// Kind of mutation recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    /// Draft linked to a catalog record by reconciliation
    BookLinked,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
            Self::BookLinked => "BOOK_LINKED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "UPDATED" => Ok(Self::Updated),
            "DELETED" => Ok(Self::Deleted),
            "BOOK_LINKED" => Ok(Self::BookLinked),
            other => Err(DomainError::ValidationError(format!(
                "unknown audit action: {other}"
            ))),
        }
    }
}

/// One audit trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftAuditRecord {
    /// Insertion-ordered id, set by storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub draft_id: DraftId,
    pub user_id: UserId,
    pub action: AuditAction,
    pub old_data: Option<Value>,
    pub new_data: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl DraftAuditRecord {
    fn new(
        draft_id: DraftId,
        user_id: UserId,
        action: AuditAction,
        old_data: Option<Value>,
        new_data: Option<Value>,
    ) -> Self {
        Self {
            id: None,
            draft_id,
            user_id,
            action,
            old_data,
            new_data,
            timestamp: Utc::now(),
        }
    }

    pub fn created(draft: &ReviewDraft) -> Self {
        Self::new(
            draft.id,
            draft.owner_id.clone(),
            AuditAction::Created,
            None,
            snapshot(draft),
        )
    }

    pub fn updated(before: &ReviewDraft, after: &ReviewDraft) -> Self {
        Self::new(
            after.id,
            after.owner_id.clone(),
            AuditAction::Updated,
            snapshot(before),
            snapshot(after),
        )
    }

    /// Soft delete keeps an after-image, hard delete and expiry do not
    pub fn deleted(before: &ReviewDraft, after: Option<&ReviewDraft>) -> Self {
        Self::new(
            before.id,
            before.owner_id.clone(),
            AuditAction::Deleted,
            snapshot(before),
            after.and_then(snapshot),
        )
    }

    pub fn book_linked(
        before: &ReviewDraft,
        book_id: BookId,
        new_version: i64,
        created: bool,
    ) -> Self {
        Self::new(
            before.id,
            before.owner_id.clone(),
            AuditAction::BookLinked,
            Some(json!({ "bookId": before.book_id, "version": before.version })),
            Some(json!({
                "bookId": book_id,
                "version": new_version,
                "catalogEntryCreated": created,
            })),
        )
    }
}

fn snapshot(draft: &ReviewDraft) -> Option<Value> {
    serde_json::to_value(draft).ok()
}
