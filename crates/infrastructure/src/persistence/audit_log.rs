//! SQLite draft audit trail
//!
//! Implements `DraftAuditLogPort`. Records are only ever inserted; the
//! autoincrement id gives insertion order.

use application::{error::ApplicationError, ports::DraftAuditLogPort};
use async_trait::async_trait;
use domain::{AuditAction, DraftAuditRecord, DraftId, UserId};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::{
    error::map_sqlx_error,
    timestamps::{from_db_time, from_json_column, to_db_time, to_json_column},
};

/// SQLite-based draft audit log
#[derive(Debug, Clone)]
pub struct SqliteDraftAuditLog {
    pool: SqlitePool,
}

impl SqliteDraftAuditLog {
    /// Create a new SQLite audit log
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Row type for audit queries
#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    draft_id: String,
    user_id: String,
    action: String,
    old_data: Option<String>,
    new_data: Option<String>,
    timestamp: String,
}

impl AuditRow {
    fn into_record(self) -> Result<DraftAuditRecord, ApplicationError> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            ApplicationError::Internal(format!("Invalid audit {field}: {e}"))
        };

        Ok(DraftAuditRecord {
            id: Some(self.id),
            draft_id: DraftId::parse(&self.draft_id).map_err(|e| corrupt("draft id", &e))?,
            user_id: UserId::new(self.user_id).map_err(|e| corrupt("user id", &e))?,
            action: self
                .action
                .parse::<AuditAction>()
                .map_err(|e| corrupt("action", &e))?,
            old_data: from_json_column::<Value>(self.old_data.as_deref())?,
            new_data: from_json_column::<Value>(self.new_data.as_deref())?,
            timestamp: from_db_time(&self.timestamp)?,
        })
    }
}

fn into_records(rows: Vec<AuditRow>) -> Result<Vec<DraftAuditRecord>, ApplicationError> {
    rows.into_iter().map(AuditRow::into_record).collect()
}

#[async_trait]
impl DraftAuditLogPort for SqliteDraftAuditLog {
    #[instrument(skip(self, record), fields(draft_id = %record.draft_id, action = %record.action))]
    async fn append(&self, record: &DraftAuditRecord) -> Result<i64, ApplicationError> {
        let result = sqlx::query(
            "INSERT INTO review_draft_audit \
             (draft_id, user_id, action, old_data, new_data, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.draft_id.to_string())
        .bind(record.user_id.as_str())
        .bind(record.action.as_str())
        .bind(to_json_column(record.old_data.as_ref())?)
        .bind(to_json_column(record.new_data.as_ref())?)
        .bind(to_db_time(record.timestamp))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        debug!(audit_id = id, "Audit record appended");
        Ok(id)
    }

    #[instrument(skip(self), fields(draft_id = %draft_id))]
    async fn for_draft(
        &self,
        draft_id: &DraftId,
    ) -> Result<Vec<DraftAuditRecord>, ApplicationError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            "SELECT id, draft_id, user_id, action, old_data, new_data, timestamp \
             FROM review_draft_audit WHERE draft_id = $1 ORDER BY id ASC",
        )
        .bind(draft_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        into_records(rows)
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: u32) -> Result<Vec<DraftAuditRecord>, ApplicationError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            "SELECT id, draft_id, user_id, action, old_data, new_data, timestamp \
             FROM review_draft_audit ORDER BY id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        into_records(rows)
    }
}
