//! Draft Service - The public create-or-update, get, list and delete
//! operations for review drafts
//!
//! Every operation runs inside the latency monitor. Mutations are audited
//! through the asynchronous audit writer after the store commits; a read
//! triggers book reconciliation and then refreshes `last_accessed` in the
//! background.

use std::{sync::Arc, time::Duration};

use chrono::{Duration as ChronoDuration, Utc};
use domain::{
    ContentLimits, DEFAULT_RETENTION_DAYS, DraftAuditRecord, DraftId, DraftInput, DraftPatch,
    ReviewDraft, UserId,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::{
    audit_writer::AuditWriterHandle,
    book_reconciler::{BookReconciler, Reconciliation},
    bounded::{DEFAULT_STORE_TIMEOUT, bounded},
    latency_monitor::{HealthReport, LatencyMonitor, Operation},
};
use crate::{
    error::ApplicationError,
    ports::{BookCatalogPort, DraftListQuery, DraftStatistics, DraftStorePort},
};

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: u32 = 5;
/// Largest accepted page size
pub const MAX_PAGE_SIZE: u32 = 50;

/// Rules the service applies to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftPolicy {
    /// Lifetime granted by each write
    pub retention: ChronoDuration,
    pub limits: ContentLimits,
    /// Bound on each store call
    pub store_timeout: Duration,
}

impl Default for DraftPolicy {
    fn default() -> Self {
        Self {
            retention: ChronoDuration::days(DEFAULT_RETENTION_DAYS),
            limits: ContentLimits::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Create-or-update request
///
/// Without `draft_id` a new draft is created. With `draft_id` the update
/// only applies when `expected_version` matches the stored version.
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub draft_id: Option<DraftId>,
    pub expected_version: Option<i64>,
    pub input: DraftInput,
}

impl SaveRequest {
    pub fn create(input: DraftInput) -> Self {
        Self {
            draft_id: None,
            expected_version: None,
            input,
        }
    }

    pub fn update(draft_id: DraftId, expected_version: i64, input: DraftInput) -> Self {
        Self {
            draft_id: Some(draft_id),
            expected_version: Some(expected_version),
            input,
        }
    }
}

/// Listing request; missing values fall back to page 1 and
/// [`DEFAULT_PAGE_SIZE`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRequest {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub include_abandoned: bool,
}

/// A listed draft with expiry annotations computed at read time
#[derive(Debug, Clone, Serialize)]
pub struct DraftSummary {
    #[serde(flatten)]
    pub draft: ReviewDraft,
    pub is_expired: bool,
    pub days_until_expiry: i64,
}

/// One page of a user's drafts
#[derive(Debug, Clone, Serialize)]
pub struct DraftPage {
    pub items: Vec<DraftSummary>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// A draft returned by `get`, with what reconciliation did
#[derive(Debug, Clone, Serialize)]
pub struct RestoredDraft {
    pub draft: ReviewDraft,
    pub reconciliation: Reconciliation,
}

/// How `delete` removes a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Mark `ABANDONED`; still readable by id until expiry
    #[default]
    Soft,
    /// Remove the record
    Hard,
}

/// Facade over store, reconciler, audit writer and latency monitor
pub struct DraftService {
    drafts: Arc<dyn DraftStorePort>,
    catalog: Arc<dyn BookCatalogPort>,
    reconciler: Arc<BookReconciler>,
    audit: AuditWriterHandle,
    monitor: Arc<LatencyMonitor>,
    policy: DraftPolicy,
}

impl std::fmt::Debug for DraftService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DraftService {
    /// Create a new draft service
    pub fn new(
        drafts: Arc<dyn DraftStorePort>,
        catalog: Arc<dyn BookCatalogPort>,
        reconciler: Arc<BookReconciler>,
        audit: AuditWriterHandle,
        monitor: Arc<LatencyMonitor>,
        policy: DraftPolicy,
    ) -> Self {
        Self {
            drafts,
            catalog,
            reconciler,
            audit,
            monitor,
            policy,
        }
    }

    pub const fn policy(&self) -> &DraftPolicy {
        &self.policy
    }

    /// Create a draft, or update one under optimistic concurrency
    ///
    /// Updating an `ABANDONED` draft reactivates it.
    #[instrument(skip(self, request), fields(owner_id = %owner_id, draft_id = ?request.draft_id))]
    pub async fn save(
        &self,
        owner_id: &UserId,
        request: SaveRequest,
    ) -> Result<ReviewDraft, ApplicationError> {
        self.monitor
            .measure(Operation::Save, self.save_inner(owner_id, request))
            .await
    }

    async fn save_inner(
        &self,
        owner_id: &UserId,
        request: SaveRequest,
    ) -> Result<ReviewDraft, ApplicationError> {
        request.input.check(&self.policy.limits)?;

        if let Some(book_id) = request.input.book_id {
            let book = bounded(
                self.policy.store_timeout,
                "catalog lookup",
                self.catalog.get(&book_id),
            )
            .await?;
            if book.is_none() {
                return Err(ApplicationError::NotFound(format!("book {book_id}")));
            }
        }

        match request.draft_id {
            None => {
                let draft = ReviewDraft::create(
                    owner_id.clone(),
                    request.input,
                    Utc::now(),
                    self.policy.retention,
                );
                let stored = bounded(
                    self.policy.store_timeout,
                    "create draft",
                    self.drafts.create(&draft),
                )
                .await?;
                self.audit.record(DraftAuditRecord::created(&stored));
                info!(draft_id = %stored.id, "Created draft");
                Ok(stored)
            },
            Some(draft_id) => {
                let expected = request.expected_version.ok_or_else(|| {
                    ApplicationError::Validation(
                        "expected_version is required when updating".to_string(),
                    )
                })?;
                let change = bounded(
                    self.policy.store_timeout,
                    "update draft",
                    self.drafts.conditional_update(
                        &draft_id,
                        owner_id,
                        expected,
                        DraftPatch::from_input(request.input),
                    ),
                )
                .await?;
                self.audit
                    .record(DraftAuditRecord::updated(&change.previous, &change.current));
                debug!(draft_id = %draft_id, version = change.current.version, "Updated draft");
                Ok(change.current)
            },
        }
    }

    /// Read a draft, reconciling its inline book snapshot when needed
    ///
    /// Expired drafts read as not found.
    #[instrument(skip(self), fields(owner_id = %owner_id, draft_id = %draft_id))]
    pub async fn get(
        &self,
        owner_id: &UserId,
        draft_id: &DraftId,
    ) -> Result<RestoredDraft, ApplicationError> {
        self.monitor
            .measure(Operation::Restore, self.get_inner(owner_id, draft_id))
            .await
    }

    async fn get_inner(
        &self,
        owner_id: &UserId,
        draft_id: &DraftId,
    ) -> Result<RestoredDraft, ApplicationError> {
        let draft = bounded(
            self.policy.store_timeout,
            "get draft",
            self.drafts.get(draft_id, owner_id),
        )
        .await?;
        if draft.is_expired_at(Utc::now()) {
            return Err(ApplicationError::draft_not_found(draft_id));
        }

        let (draft, reconciliation) = self.reconciler.reconcile(draft).await;
        self.spawn_touch(draft.id, owner_id.clone());

        Ok(RestoredDraft {
            draft,
            reconciliation,
        })
    }

    fn spawn_touch(&self, draft_id: DraftId, owner_id: UserId) {
        let drafts = Arc::clone(&self.drafts);
        let limit = self.policy.store_timeout;
        tokio::spawn(async move {
            let touched = bounded(
                limit,
                "touch draft",
                drafts.touch(&draft_id, &owner_id, Utc::now()),
            )
            .await;
            if let Err(e) = touched {
                debug!(error = %e, draft_id = %draft_id, "Failed to update last accessed time");
            }
        });
    }

    /// List a user's drafts, most recently updated first
    #[instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn list(
        &self,
        owner_id: &UserId,
        request: ListRequest,
    ) -> Result<DraftPage, ApplicationError> {
        self.monitor
            .measure(Operation::List, self.list_inner(owner_id, request))
            .await
    }

    async fn list_inner(
        &self,
        owner_id: &UserId,
        request: ListRequest,
    ) -> Result<DraftPage, ApplicationError> {
        let query = DraftListQuery {
            page: request.page.unwrap_or(1).max(1),
            page_size: request
                .page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            include_abandoned: request.include_abandoned,
        };
        let stored = bounded(
            self.policy.store_timeout,
            "list drafts",
            self.drafts.list(owner_id, query),
        )
        .await?;

        let now = Utc::now();
        let items = stored
            .items
            .into_iter()
            .map(|draft| DraftSummary {
                is_expired: draft.is_expired_at(now),
                days_until_expiry: draft.days_until_expiry(now),
                draft,
            })
            .collect();
        let total_pages = stored.total.div_ceil(u64::from(query.page_size));

        Ok(DraftPage {
            items,
            page: query.page,
            page_size: query.page_size,
            total: stored.total,
            total_pages,
            has_next: u64::from(query.page) < total_pages,
            has_previous: query.page > 1,
        })
    }

    /// Soft or hard delete a draft owned by `owner_id`
    #[instrument(skip(self), fields(owner_id = %owner_id, draft_id = %draft_id))]
    pub async fn delete(
        &self,
        owner_id: &UserId,
        draft_id: &DraftId,
        mode: DeleteMode,
    ) -> Result<(), ApplicationError> {
        self.monitor
            .measure(Operation::Delete, self.delete_inner(owner_id, draft_id, mode))
            .await
    }

    async fn delete_inner(
        &self,
        owner_id: &UserId,
        draft_id: &DraftId,
        mode: DeleteMode,
    ) -> Result<(), ApplicationError> {
        match mode {
            DeleteMode::Soft => {
                let change = bounded(
                    self.policy.store_timeout,
                    "soft delete draft",
                    self.drafts.soft_delete(draft_id, owner_id),
                )
                .await?;
                self.audit.record(DraftAuditRecord::deleted(
                    &change.previous,
                    Some(&change.current),
                ));
                info!(draft_id = %draft_id, "Abandoned draft");
            },
            DeleteMode::Hard => {
                let removed = bounded(
                    self.policy.store_timeout,
                    "hard delete draft",
                    self.drafts.hard_delete(draft_id, owner_id),
                )
                .await?;
                self.audit.record(DraftAuditRecord::deleted(&removed, None));
                info!(draft_id = %draft_id, "Deleted draft");
            },
        }
        Ok(())
    }

    /// Aggregate draft counts
    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<DraftStatistics, ApplicationError> {
        bounded(
            self.policy.store_timeout,
            "draft statistics",
            self.drafts.statistics(Utc::now()),
        )
        .await
    }

    /// Latency health summary
    pub fn health(&self) -> HealthReport {
        self.monitor.health()
    }
}

#[cfg(test)]
mod tests {
    use domain::{AuditAction, BookSnapshot, CatalogBook, DraftStatus};

    use super::*;
    use crate::{
        services::{audit_writer::AuditWriter, latency_monitor::Outcome},
        testing::{InMemoryAuditLog, InMemoryCatalog, InMemoryDraftStore},
    };

    const REVIEW: &str = "<p>데미안을 읽고 쓴 감상문입니다</p>";
    const REVISED: &str = "<p>두 번째로 고쳐 쓴 감상문입니다</p>";

    struct Fixture {
        service: Arc<DraftService>,
        store: Arc<InMemoryDraftStore>,
        catalog: Arc<InMemoryCatalog>,
        audit_log: Arc<InMemoryAuditLog>,
        monitor: Arc<LatencyMonitor>,
    }

    impl Fixture {
        async fn audit_actions(&self, expected: usize) -> Vec<AuditAction> {
            for _ in 0..100 {
                if self.audit_log.records().len() >= expected {
                    break;
                }
                tokio::task::yield_now().await;
            }
            self.audit_log.records().iter().map(|r| r.action).collect()
        }
    }

    fn fixture() -> Fixture {
        let policy = DraftPolicy::default();
        let store = Arc::new(InMemoryDraftStore::new(policy.retention));
        let catalog = Arc::new(InMemoryCatalog::new());
        let audit_log = Arc::new(InMemoryAuditLog::new());
        let monitor = Arc::new(LatencyMonitor::default());
        let (audit, _task) = AuditWriter::spawn(audit_log.clone(), 64);
        let reconciler = Arc::new(BookReconciler::new(
            store.clone(),
            catalog.clone(),
            audit.clone(),
            monitor.clone(),
        ));
        let service = Arc::new(DraftService::new(
            store.clone(),
            catalog.clone(),
            reconciler,
            audit,
            monitor.clone(),
            policy,
        ));
        Fixture {
            service,
            store,
            catalog,
            audit_log,
            monitor,
        }
    }

    fn owner() -> UserId {
        UserId::new("reader-1").unwrap()
    }

    fn demian_input(content: &str) -> DraftInput {
        DraftInput::new(content).with_book_data(BookSnapshot::new("데미안", "헤르만 헤세"))
    }

    #[tokio::test]
    async fn save_update_then_stale_update_conflicts() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(demian_input(REVIEW)))
            .await
            .unwrap();
        assert_eq!(created.version, 1);
        assert!(created.book_id.is_none());

        let updated = f
            .service
            .save(&owner(), SaveRequest::update(created.id, 1, demian_input(REVISED)))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let stale = f
            .service
            .save(&owner(), SaveRequest::update(created.id, 1, demian_input(REVIEW)))
            .await
            .unwrap_err();
        assert!(matches!(
            stale,
            ApplicationError::VersionConflict { expected: 1, .. }
        ));
        assert_eq!(f.store.raw(&created.id).unwrap().content, REVISED);

        let actions = f.audit_actions(2).await;
        assert_eq!(actions, vec![AuditAction::Created, AuditAction::Updated]);
    }

    #[tokio::test]
    async fn nine_visible_chars_fail_validation() {
        let f = fixture();
        let err = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new("<b>123456789</b>")))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(!err.is_conflict());
        assert_eq!(f.store.len(), 0);
        let stats = f.monitor.stats(Operation::Save);
        assert_eq!(stats.total_rejected, 1);
        assert!(stats.error_rate.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn update_requires_expected_version() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
            .await
            .unwrap();
        let request = SaveRequest {
            draft_id: Some(created.id),
            expected_version: None,
            input: DraftInput::new(REVISED),
        };
        let err = f.service.save(&owner(), request).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_catalog_book_is_not_found() {
        let f = fixture();
        let input = DraftInput::new(REVIEW).with_book_id(domain::BookId::new());
        let err = f
            .service
            .save(&owner(), SaveRequest::create(input))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(_)));
    }

    #[tokio::test]
    async fn known_catalog_book_is_accepted() {
        let f = fixture();
        let snapshot = BookSnapshot::new("이방인", "알베르 카뮈");
        let book =
            CatalogBook::from_snapshot(&snapshot, snapshot.natural_key().unwrap(), Utc::now());
        f.catalog.insert_raw(book.clone());
        let saved = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW).with_book_id(book.id)))
            .await
            .unwrap();
        assert_eq!(saved.book_id, Some(book.id));
    }

    #[tokio::test]
    async fn other_owner_cannot_read_or_update() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
            .await
            .unwrap();
        let intruder = UserId::new("reader-2").unwrap();

        let read = f.service.get(&intruder, &created.id).await.unwrap_err();
        assert!(matches!(read, ApplicationError::NotFound(_)));

        let write = f
            .service
            .save(&intruder, SaveRequest::update(created.id, 1, DraftInput::new(REVISED)))
            .await
            .unwrap_err();
        assert!(matches!(write, ApplicationError::NotFound(_)));
        assert_eq!(f.store.raw(&created.id).unwrap().owner_id, owner());
    }

    #[tokio::test]
    async fn get_roundtrips_and_reconciles() {
        let f = fixture();
        let input = demian_input(REVIEW)
            .with_title("방황하는 청춘에게")
            .with_metadata(serde_json::json!({"wordCount": 3}));
        let created = f
            .service
            .save(&owner(), SaveRequest::create(input.clone()))
            .await
            .unwrap();

        let restored = f.service.get(&owner(), &created.id).await.unwrap();

        assert_eq!(restored.draft.content, input.content);
        assert_eq!(restored.draft.title, input.title);
        assert_eq!(restored.draft.book_data, input.book_data);
        assert_eq!(restored.draft.metadata, input.metadata);
        assert!(restored.reconciliation.relinked());
        assert_eq!(restored.draft.book_id, restored.reconciliation.book_id());
        assert_eq!(f.catalog.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_gets_observe_one_book() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(demian_input(REVIEW)))
            .await
            .unwrap();

        let a = Arc::clone(&f.service);
        let b = Arc::clone(&f.service);
        let id = created.id;
        let (left, right) = tokio::join!(
            async move { a.get(&owner(), &id).await },
            async move { b.get(&owner(), &id).await }
        );
        let (left, right) = (left.unwrap(), right.unwrap());

        assert_eq!(f.catalog.len(), 1);
        assert!(left.draft.book_id.is_some());
        assert_eq!(left.draft.book_id, right.draft.book_id);
        assert_eq!(
            u8::from(left.reconciliation.relinked()) + u8::from(right.reconciliation.relinked()),
            1
        );
    }

    #[tokio::test]
    async fn expired_draft_reads_as_not_found() {
        let f = fixture();
        let draft = ReviewDraft::create(
            owner(),
            DraftInput::new(REVIEW),
            Utc::now() - ChronoDuration::days(31),
            ChronoDuration::days(30),
        );
        f.store.insert_raw(draft.clone());

        let err = f.service.get(&owner(), &draft.id).await.unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(_)));
    }

    #[tokio::test]
    async fn expired_draft_cannot_be_saved_back() {
        let f = fixture();
        let draft = ReviewDraft::create(
            owner(),
            DraftInput::new(REVIEW),
            Utc::now() - ChronoDuration::days(31),
            ChronoDuration::days(30),
        );
        f.store.insert_raw(draft.clone());

        let err = f
            .service
            .save(&owner(), SaveRequest::update(draft.id, 1, DraftInput::new(REVISED)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(_)));
        let stored = f.store.raw(&draft.id).unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.content, REVIEW);
    }

    #[tokio::test]
    async fn get_touches_last_accessed() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        f.service.get(&owner(), &created.id).await.unwrap();
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }

        let stored = f.store.raw(&created.id).unwrap();
        assert!(stored.last_accessed > created.last_accessed);
        assert_eq!(stored.version, created.version);
    }

    #[tokio::test]
    async fn soft_deleted_draft_is_hidden_but_readable() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
            .await
            .unwrap();

        f.service
            .delete(&owner(), &created.id, DeleteMode::Soft)
            .await
            .unwrap();

        let page = f.service.list(&owner(), ListRequest::default()).await.unwrap();
        assert_eq!(page.total, 0);
        let with_abandoned = f
            .service
            .list(
                &owner(),
                ListRequest {
                    include_abandoned: true,
                    ..ListRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(with_abandoned.total, 1);

        let restored = f.service.get(&owner(), &created.id).await.unwrap();
        assert_eq!(restored.draft.status, DraftStatus::Abandoned);
        assert_eq!(restored.draft.version, 2);
    }

    #[tokio::test]
    async fn saving_abandoned_draft_reactivates_it() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
            .await
            .unwrap();
        f.service
            .delete(&owner(), &created.id, DeleteMode::Soft)
            .await
            .unwrap();

        let revived = f
            .service
            .save(&owner(), SaveRequest::update(created.id, 2, DraftInput::new(REVISED)))
            .await
            .unwrap();
        assert_eq!(revived.status, DraftStatus::Draft);
        assert_eq!(revived.version, 3);
    }

    #[tokio::test]
    async fn hard_delete_removes_and_audits() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
            .await
            .unwrap();

        f.service
            .delete(&owner(), &created.id, DeleteMode::Hard)
            .await
            .unwrap();

        assert!(f.store.raw(&created.id).is_none());
        let again = f
            .service
            .delete(&owner(), &created.id, DeleteMode::Hard)
            .await
            .unwrap_err();
        assert!(matches!(again, ApplicationError::NotFound(_)));
        assert_eq!(
            f.audit_actions(2).await,
            vec![AuditAction::Created, AuditAction::Deleted]
        );
    }

    #[tokio::test]
    async fn list_pages_and_clamps() {
        let f = fixture();
        for _ in 0..7 {
            f.service
                .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
                .await
                .unwrap();
        }

        let first = f.service.list(&owner(), ListRequest::default()).await.unwrap();
        assert_eq!(first.items.len(), 5);
        assert_eq!(first.total, 7);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next);
        assert!(!first.has_previous);
        assert!(first.items.iter().all(|i| !i.is_expired && i.days_until_expiry == 30));
        assert!(
            first
                .items
                .windows(2)
                .all(|w| w[0].draft.updated_at >= w[1].draft.updated_at)
        );

        let second = f
            .service
            .list(
                &owner(),
                ListRequest {
                    page: Some(2),
                    ..ListRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(!second.has_next);
        assert!(second.has_previous);

        let clamped = f
            .service
            .list(
                &owner(),
                ListRequest {
                    page: Some(0),
                    page_size: Some(500),
                    include_abandoned: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.page_size, MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn operations_are_measured() {
        let f = fixture();
        let created = f
            .service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
            .await
            .unwrap();
        f.service.get(&owner(), &created.id).await.unwrap();
        f.service.list(&owner(), ListRequest::default()).await.unwrap();
        f.service
            .delete(&owner(), &created.id, DeleteMode::Hard)
            .await
            .unwrap();

        for operation in [Operation::Save, Operation::Restore, Operation::List, Operation::Delete] {
            assert_eq!(f.monitor.stats(operation).samples, 1, "{operation}");
        }
        assert!(f.service.health().is_healthy());
    }

    #[tokio::test]
    async fn store_failures_count_as_errors() {
        let f = fixture();
        f.monitor
            .record(Operation::Save, Duration::from_millis(1), Outcome::Failed);
        let report = f.service.health();
        assert!(!report.is_healthy());
    }

    #[tokio::test]
    async fn statistics_reflect_store() {
        let f = fixture();
        let a = f
            .service
            .save(&owner(), SaveRequest::create(demian_input(REVIEW)))
            .await
            .unwrap();
        f.service
            .save(&owner(), SaveRequest::create(DraftInput::new(REVIEW)))
            .await
            .unwrap();
        f.service.delete(&owner(), &a.id, DeleteMode::Soft).await.unwrap();

        let stats = f.service.statistics().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.unreconciled, 1);
        assert_eq!(stats.expired, 0);
    }
}
