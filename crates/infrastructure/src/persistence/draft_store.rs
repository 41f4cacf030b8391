//! SQLite review draft store
//!
//! Implements `DraftStorePort` on top of sqlx. Every write is a
//! version-matched `UPDATE ... WHERE id = ? AND owner_id = ? AND version = ?`;
//! a zero row count is resolved into `NotFound` or `VersionConflict` by
//! re-reading the row.

use application::{
    error::ApplicationError,
    ports::{DraftChange, DraftListQuery, DraftStatistics, DraftStorePort, StoredDraftPage},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use domain::{BookId, BookSnapshot, DraftId, DraftPatch, DraftStatus, ReviewDraft, UserId};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, instrument, warn};

use super::{
    error::map_sqlx_error,
    timestamps::{from_db_time, from_json_column, to_db_time, to_json_column},
};

const DRAFT_COLUMNS: &str = "id, owner_id, content, title, book_id, book_data, metadata, \
                             status, version, expires_at, last_accessed, created_at, updated_at";

/// Conflicting writers a soft delete will step past before giving up
const SOFT_DELETE_ATTEMPTS: usize = 3;

/// SQLite-backed review draft store
#[derive(Debug, Clone)]
pub struct SqliteDraftStore {
    pool: SqlitePool,
    retention: Duration,
}

impl SqliteDraftStore {
    /// Create a store whose writes push `expires_at` to `now + retention`
    #[must_use]
    pub const fn new(pool: SqlitePool, retention: Duration) -> Self {
        Self { pool, retention }
    }

    async fn fetch(
        &self,
        id: &DraftId,
        owner_id: &UserId,
    ) -> Result<Option<ReviewDraft>, ApplicationError> {
        let sql =
            format!("SELECT {DRAFT_COLUMNS} FROM review_drafts WHERE id = $1 AND owner_id = $2");
        let row: Option<DraftRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .bind(owner_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(DraftRow::into_draft).transpose()
    }

    async fn fetch_many(
        &self,
        sql: &str,
        binds: &[BindValue],
    ) -> Result<Vec<ReviewDraft>, ApplicationError> {
        let mut query = sqlx::query_as::<_, DraftRow>(sql);
        for bind in binds {
            query = match bind {
                BindValue::Text(s) => query.bind(s.clone()),
                BindValue::Int(n) => query.bind(*n),
            };
        }
        query
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .into_iter()
            .map(DraftRow::into_draft)
            .collect()
    }
}

enum BindValue {
    Text(String),
    Int(i64),
}

#[async_trait]
impl DraftStorePort for SqliteDraftStore {
    #[instrument(skip(self, draft), fields(draft_id = %draft.id, owner_id = %draft.owner_id))]
    async fn create(&self, draft: &ReviewDraft) -> Result<ReviewDraft, ApplicationError> {
        let sql = format!(
            "INSERT INTO review_drafts ({DRAFT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        bind_draft(sqlx::query(&sql), draft)?
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!("Created review draft");
        Ok(draft.clone())
    }

    #[instrument(skip(self, patch), fields(draft_id = %id, owner_id = %owner_id, expected_version))]
    async fn conditional_update(
        &self,
        id: &DraftId,
        owner_id: &UserId,
        expected_version: i64,
        patch: DraftPatch,
    ) -> Result<DraftChange, ApplicationError> {
        let conflict = || ApplicationError::VersionConflict {
            draft_id: *id,
            expected: expected_version,
        };

        let now = Utc::now();
        let previous = self
            .fetch(id, owner_id)
            .await?
            .filter(|draft| !draft.is_expired_at(now))
            .ok_or_else(|| ApplicationError::draft_not_found(id))?;
        if previous.version != expected_version {
            return Err(conflict());
        }

        let current = previous.apply(patch, now, self.retention);
        let result = sqlx::query(
            "UPDATE review_drafts SET content = $1, title = $2, book_id = $3, book_data = $4, \
             metadata = $5, status = $6, version = $7, expires_at = $8, last_accessed = $9, \
             updated_at = $10 \
             WHERE id = $11 AND owner_id = $12 AND version = $13 AND expires_at > $14",
        )
        .bind(&current.content)
        .bind(current.title.as_deref())
        .bind(current.book_id.map(|b| b.to_string()))
        .bind(to_json_column(current.book_data.as_ref())?)
        .bind(to_json_column(current.metadata.as_ref())?)
        .bind(current.status.as_str())
        .bind(current.version)
        .bind(to_db_time(current.expires_at))
        .bind(to_db_time(current.last_accessed))
        .bind(to_db_time(current.updated_at))
        .bind(id.to_string())
        .bind(owner_id.as_str())
        .bind(expected_version)
        .bind(to_db_time(now))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            // Lost the race between read and write
            return match self.fetch(id, owner_id).await? {
                Some(draft) if !draft.is_expired_at(now) => Err(conflict()),
                _ => Err(ApplicationError::draft_not_found(id)),
            };
        }

        debug!(version = current.version, "Review draft updated");
        Ok(DraftChange { previous, current })
    }

    #[instrument(skip(self), fields(draft_id = %id, owner_id = %owner_id))]
    async fn get(&self, id: &DraftId, owner_id: &UserId) -> Result<ReviewDraft, ApplicationError> {
        self.fetch(id, owner_id)
            .await?
            .ok_or_else(|| ApplicationError::draft_not_found(id))
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, page = query.page))]
    async fn list(
        &self,
        owner_id: &UserId,
        query: DraftListQuery,
    ) -> Result<StoredDraftPage, ApplicationError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM review_drafts WHERE owner_id = $1 AND ($2 OR status = 'DRAFT')",
        )
        .bind(owner_id.as_str())
        .bind(query.include_abandoned)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let sql = format!(
            "SELECT {DRAFT_COLUMNS} FROM review_drafts \
             WHERE owner_id = $1 AND ($2 OR status = 'DRAFT') \
             ORDER BY updated_at DESC, id \
             LIMIT $3 OFFSET $4"
        );
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
        let rows: Vec<DraftRow> = sqlx::query_as(&sql)
            .bind(owner_id.as_str())
            .bind(query.include_abandoned)
            .bind(i64::from(query.page_size))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = rows
            .into_iter()
            .map(DraftRow::into_draft)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = items.len(), total, "Listed review drafts");
        Ok(StoredDraftPage {
            items,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    #[instrument(skip(self), fields(draft_id = %id, owner_id = %owner_id))]
    async fn soft_delete(
        &self,
        id: &DraftId,
        owner_id: &UserId,
    ) -> Result<DraftChange, ApplicationError> {
        let mut last_error = ApplicationError::draft_not_found(id);
        for attempt in 1..=SOFT_DELETE_ATTEMPTS {
            let current = self.get(id, owner_id).await?;
            match self
                .conditional_update(id, owner_id, current.version, DraftPatch::abandon())
                .await
            {
                Err(e) if e.is_conflict() => {
                    debug!(attempt, "Soft delete raced with another writer");
                    last_error = e;
                },
                other => return other,
            }
        }
        warn!("Soft delete gave up after repeated version conflicts");
        Err(last_error)
    }

    #[instrument(skip(self), fields(draft_id = %id, owner_id = %owner_id))]
    async fn hard_delete(
        &self,
        id: &DraftId,
        owner_id: &UserId,
    ) -> Result<ReviewDraft, ApplicationError> {
        let sql = format!(
            "DELETE FROM review_drafts WHERE id = $1 AND owner_id = $2 RETURNING {DRAFT_COLUMNS}"
        );
        let row: Option<DraftRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .bind(owner_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let removed = row
            .ok_or_else(|| ApplicationError::draft_not_found(id))?
            .into_draft()?;
        debug!("Review draft removed");
        Ok(removed)
    }

    #[instrument(skip(self), fields(draft_id = %id))]
    async fn touch(
        &self,
        id: &DraftId,
        owner_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let at = to_db_time(at);
        sqlx::query(
            "UPDATE review_drafts SET last_accessed = $1 \
             WHERE id = $2 AND owner_id = $3 AND last_accessed < $4",
        )
        .bind(&at)
        .bind(id.to_string())
        .bind(owner_id.as_str())
        .bind(&at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewDraft>, ApplicationError> {
        let sql = format!(
            "SELECT {DRAFT_COLUMNS} FROM review_drafts \
             WHERE expires_at <= $1 ORDER BY expires_at ASC LIMIT $2"
        );
        self.fetch_many(
            &sql,
            &[BindValue::Text(to_db_time(now)), BindValue::Int(i64::from(limit))],
        )
        .await
    }

    #[instrument(skip(self), fields(draft_id = %id))]
    async fn delete_expired(
        &self,
        id: &DraftId,
        now: DateTime<Utc>,
    ) -> Result<bool, ApplicationError> {
        let result = sqlx::query("DELETE FROM review_drafts WHERE id = $1 AND expires_at <= $2")
            .bind(id.to_string())
            .bind(to_db_time(now))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_over_cap(
        &self,
        cap: u32,
        limit: u32,
    ) -> Result<Vec<ReviewDraft>, ApplicationError> {
        let sql = format!(
            "SELECT {DRAFT_COLUMNS} FROM ( \
                 SELECT *, ROW_NUMBER() OVER ( \
                     PARTITION BY owner_id ORDER BY last_accessed DESC, id \
                 ) AS rank_in_owner \
                 FROM review_drafts \
             ) WHERE rank_in_owner > $1 \
             ORDER BY last_accessed ASC LIMIT $2"
        );
        self.fetch_many(
            &sql,
            &[BindValue::Int(i64::from(cap)), BindValue::Int(i64::from(limit))],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_unreconciled(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewDraft>, ApplicationError> {
        let sql = format!(
            "SELECT {DRAFT_COLUMNS} FROM review_drafts \
             WHERE book_id IS NULL AND book_data IS NOT NULL AND expires_at > $1 \
             ORDER BY last_accessed DESC LIMIT $2"
        );
        self.fetch_many(
            &sql,
            &[BindValue::Text(to_db_time(now)), BindValue::Int(i64::from(limit))],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn statistics(&self, now: DateTime<Utc>) -> Result<DraftStatistics, ApplicationError> {
        let (total, active, abandoned, expired, unreconciled): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*), \
                 COALESCE(SUM(status = 'DRAFT'), 0), \
                 COALESCE(SUM(status = 'ABANDONED'), 0), \
                 COALESCE(SUM(expires_at <= $1), 0), \
                 COALESCE(SUM(book_id IS NULL AND book_data IS NOT NULL), 0) \
                 FROM review_drafts",
            )
            .bind(to_db_time(now))
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let count = |n: i64| u64::try_from(n).unwrap_or_default();
        Ok(DraftStatistics {
            total: count(total),
            active: count(active),
            abandoned: count(abandoned),
            expired: count(expired),
            unreconciled: count(unreconciled),
        })
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_draft<'q>(
    query: SqliteQuery<'q>,
    draft: &ReviewDraft,
) -> Result<SqliteQuery<'q>, ApplicationError> {
    Ok(query
        .bind(draft.id.to_string())
        .bind(draft.owner_id.as_str().to_string())
        .bind(draft.content.clone())
        .bind(draft.title.clone())
        .bind(draft.book_id.map(|b| b.to_string()))
        .bind(to_json_column(draft.book_data.as_ref())?)
        .bind(to_json_column(draft.metadata.as_ref())?)
        .bind(draft.status.as_str())
        .bind(draft.version)
        .bind(to_db_time(draft.expires_at))
        .bind(to_db_time(draft.last_accessed))
        .bind(to_db_time(draft.created_at))
        .bind(to_db_time(draft.updated_at)))
}

/// Row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct DraftRow {
    id: String,
    owner_id: String,
    content: String,
    title: Option<String>,
    book_id: Option<String>,
    book_data: Option<String>,
    metadata: Option<String>,
    status: String,
    version: i64,
    expires_at: String,
    last_accessed: String,
    created_at: String,
    updated_at: String,
}

impl DraftRow {
    fn into_draft(self) -> Result<ReviewDraft, ApplicationError> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            ApplicationError::Internal(format!("Invalid stored {field}: {e}"))
        };

        Ok(ReviewDraft {
            id: DraftId::parse(&self.id).map_err(|e| corrupt("draft id", &e))?,
            owner_id: UserId::new(self.owner_id).map_err(|e| corrupt("owner id", &e))?,
            content: self.content,
            title: self.title,
            book_id: self
                .book_id
                .as_deref()
                .map(BookId::parse)
                .transpose()
                .map_err(|e| corrupt("book id", &e))?,
            book_data: from_json_column::<BookSnapshot>(self.book_data.as_deref())?,
            metadata: from_json_column::<Value>(self.metadata.as_deref())?,
            status: self
                .status
                .parse::<DraftStatus>()
                .map_err(|e| corrupt("status", &e))?,
            version: self.version,
            expires_at: from_db_time(&self.expires_at)?,
            last_accessed: from_db_time(&self.last_accessed)?,
            created_at: from_db_time(&self.created_at)?,
            updated_at: from_db_time(&self.updated_at)?,
        })
    }
}
