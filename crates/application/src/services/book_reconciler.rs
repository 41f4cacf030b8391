//! Book reconciliation
//!
//! Links a draft that carries an inline book snapshot to the canonical
//! catalog record, creating that record when it does not exist yet.
//!
//! Two mechanisms keep find-or-create single-valued per natural key: an
//! in-process lock keyed by the natural key, and the catalog's own unique
//! constraint (a `Duplicate` on create is followed by a re-read). Linking
//! the draft is a conditional update keyed on the version the resolver
//! started from, so a concurrent edit is never overwritten.
//!
//! Reconciliation never fails the surrounding read. Any failure is logged
//! and reported as [`Reconciliation::Deferred`]; the snapshot stays in
//! place for the next attempt.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use domain::{
    BookId, BookSnapshot, CatalogBook, DraftAuditRecord, DraftPatch, NaturalKey, ReviewDraft,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{
    audit_writer::AuditWriterHandle,
    bounded::{DEFAULT_STORE_TIMEOUT, bounded},
    keyed_locks::KeyedLocks,
    latency_monitor::{LatencyMonitor, Operation, Outcome},
};
use crate::{
    error::ApplicationError,
    ports::{BookCatalogPort, DraftStorePort},
};

/// Default number of drafts handled per batch sweep
pub const DEFAULT_RECONCILE_BATCH: u32 = 50;

/// Result of one reconciliation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reconciliation {
    /// No inline snapshot to reconcile
    NotApplicable,
    /// The draft already had a catalog link, possibly set by a concurrent
    /// resolver
    AlreadyLinked { book_id: BookId },
    /// This call linked the draft
    Linked { book_id: BookId, created: bool },
    /// Failed transiently; retried on next access
    Deferred { reason: String },
}

impl Reconciliation {
    /// Whether this call changed the draft's link
    pub fn relinked(&self) -> bool {
        matches!(self, Self::Linked { .. })
    }

    /// The resolved catalog id, if any
    pub fn book_id(&self) -> Option<BookId> {
        match self {
            Self::AlreadyLinked { book_id } | Self::Linked { book_id, .. } => Some(*book_id),
            Self::NotApplicable | Self::Deferred { .. } => None,
        }
    }
}

/// Counts from a batch sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub scanned: usize,
    pub linked: usize,
    pub catalog_created: usize,
    pub already_linked: usize,
    pub deferred: usize,
}

/// Find-or-create resolver for inline book snapshots
pub struct BookReconciler {
    drafts: Arc<dyn DraftStorePort>,
    catalog: Arc<dyn BookCatalogPort>,
    audit: AuditWriterHandle,
    monitor: Arc<LatencyMonitor>,
    locks: KeyedLocks,
    timeout: Duration,
}

impl std::fmt::Debug for BookReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookReconciler")
            .field("timeout", &self.timeout)
            .field("active_keys", &self.locks.active_keys())
            .finish_non_exhaustive()
    }
}

impl BookReconciler {
    pub fn new(
        drafts: Arc<dyn DraftStorePort>,
        catalog: Arc<dyn BookCatalogPort>,
        audit: AuditWriterHandle,
        monitor: Arc<LatencyMonitor>,
    ) -> Self {
        Self {
            drafts,
            catalog,
            audit,
            monitor,
            locks: KeyedLocks::new(),
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound each catalog and store call
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reconcile one draft
    ///
    /// Returns the draft as it should be shown to the caller (linked when
    /// linking succeeded) and what happened.
    #[instrument(skip(self, draft), fields(draft_id = %draft.id, owner_id = %draft.owner_id))]
    pub async fn reconcile(&self, draft: ReviewDraft) -> (ReviewDraft, Reconciliation) {
        if let Some(book_id) = draft.book_id {
            return (draft, Reconciliation::AlreadyLinked { book_id });
        }
        let Some(snapshot) = draft.book_data.clone() else {
            return (draft, Reconciliation::NotApplicable);
        };
        let Some(key) = snapshot.natural_key() else {
            warn!("Book snapshot has no usable natural key");
            return (
                draft,
                Reconciliation::Deferred {
                    reason: "book snapshot has no usable natural key".to_string(),
                },
            );
        };

        let start = std::time::Instant::now();
        let result = self.resolve_and_link(&draft, &snapshot, &key).await;
        let outcome = match &result {
            Ok(_) => Outcome::Ok,
            Err(_) => Outcome::Failed,
        };
        self.monitor
            .record(Operation::BookReconcile, start.elapsed(), outcome);

        match result {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, natural_key = %key, "Book reconciliation deferred");
                (
                    draft,
                    Reconciliation::Deferred {
                        reason: e.to_string(),
                    },
                )
            },
        }
    }

    /// Link up to `limit` drafts that still carry unreconciled snapshots,
    /// most recently accessed first
    #[instrument(skip(self))]
    pub async fn reconcile_pending(
        &self,
        limit: u32,
    ) -> Result<ReconcileSummary, ApplicationError> {
        let candidates = bounded(
            self.timeout,
            "list unreconciled drafts",
            self.drafts.list_unreconciled(Utc::now(), limit),
        )
        .await?;

        let mut summary = ReconcileSummary {
            scanned: candidates.len(),
            ..ReconcileSummary::default()
        };
        for draft in candidates {
            match self.reconcile(draft).await.1 {
                Reconciliation::Linked { created, .. } => {
                    summary.linked += 1;
                    if created {
                        summary.catalog_created += 1;
                    }
                },
                Reconciliation::AlreadyLinked { .. } => summary.already_linked += 1,
                Reconciliation::Deferred { .. } => summary.deferred += 1,
                Reconciliation::NotApplicable => {},
            }
        }

        if summary.scanned > 0 {
            info!(
                scanned = summary.scanned,
                linked = summary.linked,
                catalog_created = summary.catalog_created,
                deferred = summary.deferred,
                "Reconciled pending drafts"
            );
        } else {
            debug!("No drafts awaiting reconciliation");
        }
        Ok(summary)
    }

    async fn resolve_and_link(
        &self,
        draft: &ReviewDraft,
        snapshot: &BookSnapshot,
        key: &NaturalKey,
    ) -> Result<(ReviewDraft, Reconciliation), ApplicationError> {
        let (book, created) = self.find_or_create(snapshot, key).await?;
        self.link(draft, key, book.id, created).await
    }

    async fn find_or_create(
        &self,
        snapshot: &BookSnapshot,
        key: &NaturalKey,
    ) -> Result<(CatalogBook, bool), ApplicationError> {
        let _guard = self.locks.lock(key.as_str()).await;

        if let Some(existing) = self.find(key).await? {
            debug!(book_id = %existing.id, natural_key = %key, "Found catalog entry");
            return Ok((existing, false));
        }

        let candidate = CatalogBook::from_snapshot(snapshot, key.clone(), Utc::now());
        match bounded(self.timeout, "create catalog entry", self.catalog.create(&candidate)).await {
            Ok(book) => {
                info!(
                    book_id = %book.id,
                    natural_key = %key,
                    "Created catalog entry from draft snapshot"
                );
                Ok((book, true))
            },
            Err(ApplicationError::Duplicate(_)) => {
                debug!(natural_key = %key, "Catalog entry created concurrently, re-reading");
                self.find(key).await?.map(|book| (book, false)).ok_or_else(|| {
                    ApplicationError::Internal(format!(
                        "catalog reported duplicate for {key} but lookup found nothing"
                    ))
                })
            },
            Err(e) => Err(e),
        }
    }

    async fn find(&self, key: &NaturalKey) -> Result<Option<CatalogBook>, ApplicationError> {
        bounded(self.timeout, "find catalog entry", self.catalog.find_by_natural_key(key)).await
    }

    /// Conditionally link `draft` to `book_id`
    ///
    /// After losing a version race the link is only retried when the fresh
    /// row still needs reconciling under the same natural key; an edit that
    /// replaced or cleared the snapshot wins.
    async fn link(
        &self,
        draft: &ReviewDraft,
        key: &NaturalKey,
        book_id: BookId,
        created: bool,
    ) -> Result<(ReviewDraft, Reconciliation), ApplicationError> {
        let mut base = draft.clone();
        for attempt in 0..2 {
            let update = bounded(
                self.timeout,
                "link draft",
                self.drafts.conditional_update(
                    &base.id,
                    &base.owner_id,
                    base.version,
                    DraftPatch::link_book(book_id),
                ),
            )
            .await;

            match update {
                Ok(change) => {
                    self.audit.record(DraftAuditRecord::book_linked(
                        &change.previous,
                        book_id,
                        change.current.version,
                        created,
                    ));
                    info!(
                        book_id = %book_id,
                        version = change.current.version,
                        "Linked draft to catalog entry"
                    );
                    return Ok((change.current, Reconciliation::Linked { book_id, created }));
                },
                Err(ApplicationError::VersionConflict { .. }) => {
                    let current = bounded(
                        self.timeout,
                        "re-read draft",
                        self.drafts.get(&base.id, &base.owner_id),
                    )
                    .await?;
                    if let Some(linked) = current.book_id {
                        debug!(book_id = %linked, "Draft already linked by a concurrent resolver");
                        return Ok((current, Reconciliation::AlreadyLinked { book_id: linked }));
                    }
                    let Some(snapshot) = current.book_data.as_ref() else {
                        debug!("Book snapshot cleared by a concurrent edit");
                        return Ok((current, Reconciliation::NotApplicable));
                    };
                    if snapshot.natural_key().as_ref() != Some(key) {
                        debug!(natural_key = %key, "Book snapshot replaced by a concurrent edit");
                        return Ok((
                            current,
                            Reconciliation::Deferred {
                                reason: "book snapshot changed during reconciliation".to_string(),
                            },
                        ));
                    }
                    debug!(
                        attempt,
                        version = current.version,
                        "Link lost a version race, retrying"
                    );
                    base = current;
                },
                Err(e) => return Err(e),
            }
        }

        Err(ApplicationError::VersionConflict {
            draft_id: base.id,
            expected: base.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use domain::{DraftInput, UserId};

    use super::*;
    use crate::{
        ports::MockBookCatalogPort,
        services::audit_writer::AuditWriter,
        testing::{InMemoryAuditLog, InMemoryCatalog, InMemoryDraftStore},
    };

    struct Fixture {
        store: Arc<InMemoryDraftStore>,
        catalog: Arc<InMemoryCatalog>,
        audit_log: Arc<InMemoryAuditLog>,
        reconciler: Arc<BookReconciler>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryDraftStore::new(ChronoDuration::days(30)));
        let catalog = Arc::new(InMemoryCatalog::new());
        let audit_log = Arc::new(InMemoryAuditLog::new());
        let (audit, _task) = AuditWriter::spawn(audit_log.clone(), 64);
        let reconciler = Arc::new(BookReconciler::new(
            store.clone(),
            catalog.clone(),
            audit,
            Arc::new(LatencyMonitor::default()),
        ));
        Fixture {
            store,
            catalog,
            audit_log,
            reconciler,
        }
    }

    fn draft_with(snapshot: Option<BookSnapshot>) -> ReviewDraft {
        let mut input = DraftInput::new("데미안을 읽고 쓴 감상문입니다");
        input.book_data = snapshot;
        ReviewDraft::create(
            UserId::new("reader-1").unwrap(),
            input,
            Utc::now(),
            ChronoDuration::days(30),
        )
    }

    fn demian() -> BookSnapshot {
        BookSnapshot::new("데미안", "헤르만 헤세")
    }

    #[tokio::test]
    async fn draft_without_snapshot_is_not_applicable() {
        let f = fixture();
        let (_, result) = f.reconciler.reconcile(draft_with(None)).await;
        assert_eq!(result, Reconciliation::NotApplicable);
        assert!(!result.relinked());
    }

    #[tokio::test]
    async fn linked_draft_is_left_alone() {
        let f = fixture();
        let mut draft = draft_with(Some(demian()));
        let book_id = BookId::new();
        draft.book_id = Some(book_id);
        let (_, result) = f.reconciler.reconcile(draft).await;
        assert_eq!(result, Reconciliation::AlreadyLinked { book_id });
        assert_eq!(f.catalog.create_calls(), 0);
    }

    #[tokio::test]
    async fn creates_catalog_entry_and_links() {
        let f = fixture();
        let draft = f.store.create(&draft_with(Some(demian()))).await.unwrap();

        let (linked, result) = f.reconciler.reconcile(draft.clone()).await;

        assert!(result.relinked());
        assert!(matches!(result, Reconciliation::Linked { created: true, .. }));
        assert_eq!(linked.book_id, result.book_id());
        assert_eq!(linked.version, 2);
        assert_eq!(linked.book_data, draft.book_data);
        assert_eq!(f.catalog.len(), 1);
        assert_eq!(f.store.raw(&draft.id).unwrap().book_id, result.book_id());
    }

    #[tokio::test]
    async fn links_to_existing_catalog_entry() {
        let f = fixture();
        let snapshot = demian();
        let existing =
            CatalogBook::from_snapshot(&snapshot, snapshot.natural_key().unwrap(), Utc::now());
        f.catalog.insert_raw(existing.clone());
        let draft = f.store.create(&draft_with(Some(snapshot))).await.unwrap();

        let (_, result) = f.reconciler.reconcile(draft).await;

        assert_eq!(
            result,
            Reconciliation::Linked {
                book_id: existing.id,
                created: false
            }
        );
        assert_eq!(f.catalog.create_calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_reconciles_create_one_entry() {
        let f = fixture();
        let draft = f.store.create(&draft_with(Some(demian()))).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let reconciler = Arc::clone(&f.reconciler);
            let draft = draft.clone();
            handles.push(tokio::spawn(async move { reconciler.reconcile(draft).await }));
        }
        let mut book_ids = Vec::new();
        let mut relinked = 0;
        for handle in handles {
            let (_, result) = handle.await.unwrap();
            if result.relinked() {
                relinked += 1;
            }
            book_ids.push(result.book_id().unwrap());
        }

        assert_eq!(f.catalog.len(), 1);
        assert_eq!(relinked, 1);
        assert!(book_ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(f.store.raw(&draft.id).unwrap().version, 2);
    }

    #[tokio::test]
    async fn different_drafts_same_book_share_entry() {
        let f = fixture();
        let a = f.store.create(&draft_with(Some(demian()))).await.unwrap();
        let b = f.store.create(&draft_with(Some(demian()))).await.unwrap();

        let ra = Arc::clone(&f.reconciler);
        let rb = Arc::clone(&f.reconciler);
        let (left, right) = tokio::join!(ra.reconcile(a), rb.reconcile(b));

        assert_eq!(f.catalog.len(), 1);
        assert_eq!(left.1.book_id(), right.1.book_id());
        assert!(left.1.relinked() && right.1.relinked());
    }

    #[tokio::test]
    async fn link_retries_after_content_edit() {
        let f = fixture();
        let draft = f.store.create(&draft_with(Some(demian()))).await.unwrap();
        // Concurrent autosave bumps the version but keeps the snapshot.
        f.store
            .conditional_update(
                &draft.id,
                &draft.owner_id,
                1,
                DraftPatch {
                    content: Some("편집 중에 바뀐 감상문 내용입니다".to_string()),
                    ..DraftPatch::default()
                },
            )
            .await
            .unwrap();

        let (linked, result) = f.reconciler.reconcile(draft).await;

        assert!(result.relinked());
        assert_eq!(linked.version, 3);
        assert_eq!(linked.content, "편집 중에 바뀐 감상문 내용입니다");
    }

    #[tokio::test]
    async fn replaced_snapshot_is_not_linked_to_stale_book() {
        let f = fixture();
        let draft = f.store.create(&draft_with(Some(demian()))).await.unwrap();
        let stranger = BookSnapshot::new("이방인", "알베르 카뮈");
        f.store
            .conditional_update(
                &draft.id,
                &draft.owner_id,
                1,
                DraftPatch {
                    book_data: Some(Some(stranger.clone())),
                    ..DraftPatch::default()
                },
            )
            .await
            .unwrap();

        let (returned, result) = f.reconciler.reconcile(draft.clone()).await;

        assert!(matches!(result, Reconciliation::Deferred { .. }));
        assert_eq!(returned.book_data, Some(stranger.clone()));
        let stored = f.store.raw(&draft.id).unwrap();
        assert!(stored.book_id.is_none());
        assert_eq!(stored.book_data, Some(stranger));
        assert_eq!(stored.version, 2);

        // The next pass links the draft to the book it now describes.
        let (linked, retry) = f.reconciler.reconcile(stored).await;
        assert!(retry.relinked());
        let book = f.catalog.get(&retry.book_id().unwrap()).await.unwrap().unwrap();
        assert_eq!(book.title, "이방인");
        assert_eq!(linked.book_id, retry.book_id());
    }

    #[tokio::test]
    async fn cleared_snapshot_is_not_linked() {
        let f = fixture();
        let draft = f.store.create(&draft_with(Some(demian()))).await.unwrap();
        f.store
            .conditional_update(
                &draft.id,
                &draft.owner_id,
                1,
                DraftPatch {
                    book_data: Some(None),
                    ..DraftPatch::default()
                },
            )
            .await
            .unwrap();

        let (returned, result) = f.reconciler.reconcile(draft.clone()).await;

        assert_eq!(result, Reconciliation::NotApplicable);
        assert!(returned.book_data.is_none());
        let stored = f.store.raw(&draft.id).unwrap();
        assert!(stored.book_id.is_none());
        assert!(stored.book_data.is_none());
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn catalog_failure_defers() {
        let store = Arc::new(InMemoryDraftStore::new(ChronoDuration::days(30)));
        let mut catalog = MockBookCatalogPort::new();
        catalog
            .expect_find_by_natural_key()
            .returning(|_| Err(ApplicationError::StoreUnavailable("catalog down".into())));
        catalog.expect_create().never();
        let (audit, _task) = AuditWriter::spawn(Arc::new(InMemoryAuditLog::new()), 8);
        let reconciler = BookReconciler::new(
            store.clone(),
            Arc::new(catalog),
            audit,
            Arc::new(LatencyMonitor::default()),
        );
        let draft = store.create(&draft_with(Some(demian()))).await.unwrap();

        let (returned, result) = reconciler.reconcile(draft.clone()).await;

        assert!(matches!(result, Reconciliation::Deferred { .. }));
        assert_eq!(returned, draft);
        assert!(store.raw(&draft.id).unwrap().book_id.is_none());
    }

    #[tokio::test]
    async fn pending_sweep_links_candidates() {
        let f = fixture();
        f.store.create(&draft_with(Some(demian()))).await.unwrap();
        f.store
            .create(&draft_with(Some(BookSnapshot::new("이방인", "알베르 카뮈"))))
            .await
            .unwrap();
        f.store.create(&draft_with(None)).await.unwrap();

        let summary = f.reconciler.reconcile_pending(10).await.unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.linked, 2);
        assert_eq!(summary.catalog_created, 2);
        assert_eq!(f.reconciler.reconcile_pending(10).await.unwrap().scanned, 0);
    }

    #[tokio::test]
    async fn link_is_audited() {
        let f = fixture();
        let draft = f.store.create(&draft_with(Some(demian()))).await.unwrap();
        f.reconciler.reconcile(draft.clone()).await;

        for _ in 0..50 {
            if !f.audit_log.records().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let records = f.audit_log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, domain::AuditAction::BookLinked);
        assert_eq!(records[0].draft_id, draft.id);
    }
}
