//! In-memory port fakes for service tests
//!
//! The draft store fake applies the same compare-and-swap rule as the SQL
//! adapter: a write only lands when id, owner and version all match.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use domain::{
    BookId, CatalogBook, DraftAuditRecord, DraftId, DraftPatch, DraftStatus, NaturalKey,
    ReviewDraft, UserId,
};
use parking_lot::Mutex;

use crate::{
    error::ApplicationError,
    ports::{
        BookCatalogPort, DraftAuditLogPort, DraftChange, DraftListQuery, DraftStatistics,
        DraftStorePort, StoredDraftPage,
    },
};

#[derive(Debug)]
pub struct InMemoryDraftStore {
    drafts: Mutex<HashMap<DraftId, ReviewDraft>>,
    retention: Duration,
}

impl InMemoryDraftStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            drafts: Mutex::new(HashMap::new()),
            retention,
        }
    }

    pub fn raw(&self, id: &DraftId) -> Option<ReviewDraft> {
        self.drafts.lock().get(id).cloned()
    }

    pub fn insert_raw(&self, draft: ReviewDraft) {
        self.drafts.lock().insert(draft.id, draft);
    }

    pub fn len(&self) -> usize {
        self.drafts.lock().len()
    }
}

#[async_trait]
impl DraftStorePort for InMemoryDraftStore {
    async fn create(&self, draft: &ReviewDraft) -> Result<ReviewDraft, ApplicationError> {
        let mut drafts = self.drafts.lock();
        if drafts.contains_key(&draft.id) {
            return Err(ApplicationError::Duplicate(format!("draft {}", draft.id)));
        }
        drafts.insert(draft.id, draft.clone());
        Ok(draft.clone())
    }

    async fn conditional_update(
        &self,
        id: &DraftId,
        owner_id: &UserId,
        expected_version: i64,
        patch: DraftPatch,
    ) -> Result<DraftChange, ApplicationError> {
        tokio::task::yield_now().await;
        let mut drafts = self.drafts.lock();
        let now = Utc::now();
        let current = drafts
            .get(id)
            .filter(|d| &d.owner_id == owner_id && !d.is_expired_at(now))
            .cloned()
            .ok_or_else(|| ApplicationError::draft_not_found(id))?;
        if current.version != expected_version {
            return Err(ApplicationError::VersionConflict {
                draft_id: *id,
                expected: expected_version,
            });
        }
        let next = current.apply(patch, now, self.retention);
        drafts.insert(*id, next.clone());
        Ok(DraftChange {
            previous: current,
            current: next,
        })
    }

    async fn get(&self, id: &DraftId, owner_id: &UserId) -> Result<ReviewDraft, ApplicationError> {
        tokio::task::yield_now().await;
        self.drafts
            .lock()
            .get(id)
            .filter(|d| &d.owner_id == owner_id)
            .cloned()
            .ok_or_else(|| ApplicationError::draft_not_found(id))
    }

    async fn list(
        &self,
        owner_id: &UserId,
        query: DraftListQuery,
    ) -> Result<StoredDraftPage, ApplicationError> {
        let mut items: Vec<ReviewDraft> = self
            .drafts
            .lock()
            .values()
            .filter(|d| &d.owner_id == owner_id)
            .filter(|d| query.include_abandoned || d.status == DraftStatus::Draft)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let total = items.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = items
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .collect();
        Ok(StoredDraftPage { items, total })
    }

    async fn soft_delete(
        &self,
        id: &DraftId,
        owner_id: &UserId,
    ) -> Result<DraftChange, ApplicationError> {
        let current = self.get(id, owner_id).await?;
        self.conditional_update(id, owner_id, current.version, DraftPatch::abandon())
            .await
    }

    async fn hard_delete(
        &self,
        id: &DraftId,
        owner_id: &UserId,
    ) -> Result<ReviewDraft, ApplicationError> {
        let mut drafts = self.drafts.lock();
        if !drafts.get(id).is_some_and(|d| &d.owner_id == owner_id) {
            return Err(ApplicationError::draft_not_found(id));
        }
        drafts
            .remove(id)
            .ok_or_else(|| ApplicationError::draft_not_found(id))
    }

    async fn touch(
        &self,
        id: &DraftId,
        owner_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        if let Some(d) = self.drafts.lock().get_mut(id).filter(|d| &d.owner_id == owner_id) {
            d.last_accessed = at;
        }
        Ok(())
    }

    async fn list_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewDraft>, ApplicationError> {
        let mut expired: Vec<ReviewDraft> = self
            .drafts
            .lock()
            .values()
            .filter(|d| d.expires_at <= now)
            .cloned()
            .collect();
        expired.sort_by_key(|d| d.expires_at);
        expired.truncate(limit as usize);
        Ok(expired)
    }

    async fn delete_expired(
        &self,
        id: &DraftId,
        now: DateTime<Utc>,
    ) -> Result<bool, ApplicationError> {
        let mut drafts = self.drafts.lock();
        if !drafts.get(id).is_some_and(|d| d.expires_at <= now) {
            return Ok(false);
        }
        Ok(drafts.remove(id).is_some())
    }

    async fn list_over_cap(
        &self,
        cap: u32,
        limit: u32,
    ) -> Result<Vec<ReviewDraft>, ApplicationError> {
        let mut by_owner: HashMap<UserId, Vec<ReviewDraft>> = HashMap::new();
        for d in self.drafts.lock().values() {
            by_owner.entry(d.owner_id.clone()).or_default().push(d.clone());
        }
        let mut over = Vec::new();
        for (_, mut drafts) in by_owner {
            drafts.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
            over.extend(drafts.into_iter().skip(cap as usize));
        }
        over.truncate(limit as usize);
        Ok(over)
    }

    async fn list_unreconciled(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewDraft>, ApplicationError> {
        let mut pending: Vec<ReviewDraft> = self
            .drafts
            .lock()
            .values()
            .filter(|d| d.needs_reconciliation() && d.expires_at > now)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn statistics(&self, now: DateTime<Utc>) -> Result<DraftStatistics, ApplicationError> {
        let drafts = self.drafts.lock();
        let mut stats = DraftStatistics {
            total: drafts.len() as u64,
            ..DraftStatistics::default()
        };
        for d in drafts.values() {
            match d.status {
                DraftStatus::Draft => stats.active += 1,
                DraftStatus::Abandoned => stats.abandoned += 1,
            }
            if d.is_expired_at(now) {
                stats.expired += 1;
            }
            if d.needs_reconciliation() {
                stats.unreconciled += 1;
            }
        }
        Ok(stats)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    books: Mutex<HashMap<NaturalKey, CatalogBook>>,
    creates: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.lock().len()
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn insert_raw(&self, book: CatalogBook) {
        self.books.lock().insert(book.natural_key.clone(), book);
    }
}

#[async_trait]
impl BookCatalogPort for InMemoryCatalog {
    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<CatalogBook>, ApplicationError> {
        tokio::task::yield_now().await;
        Ok(self.books.lock().get(key).cloned())
    }

    async fn create(&self, book: &CatalogBook) -> Result<CatalogBook, ApplicationError> {
        tokio::task::yield_now().await;
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut books = self.books.lock();
        if books.contains_key(&book.natural_key) {
            return Err(ApplicationError::Duplicate(format!(
                "book with key {}",
                book.natural_key
            )));
        }
        books.insert(book.natural_key.clone(), book.clone());
        Ok(book.clone())
    }

    async fn get(&self, id: &BookId) -> Result<Option<CatalogBook>, ApplicationError> {
        Ok(self.books.lock().values().find(|b| &b.id == id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: Mutex<Vec<DraftAuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DraftAuditRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl DraftAuditLogPort for InMemoryAuditLog {
    async fn append(&self, record: &DraftAuditRecord) -> Result<i64, ApplicationError> {
        let mut records = self.records.lock();
        let mut stored = record.clone();
        let id = i64::try_from(records.len()).unwrap_or(i64::MAX) + 1;
        stored.id = Some(id);
        records.push(stored);
        Ok(id)
    }

    async fn for_draft(
        &self,
        draft_id: &DraftId,
    ) -> Result<Vec<DraftAuditRecord>, ApplicationError> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| &r.draft_id == draft_id)
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<DraftAuditRecord>, ApplicationError> {
        Ok(self
            .records
            .lock()
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
