//! Expiration manager
//!
//! Reclaims drafts whose deadline has passed, plus (optionally) drafts
//! beyond a per-user cap. Every deletion is a hard delete guarded by a
//! condition, so a sweep racing another sweep or a refreshing write never
//! errors and never writes a second audit record for the same removal.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use domain::DraftAuditRecord;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::{
    audit_writer::AuditWriterHandle,
    bounded::{DEFAULT_STORE_TIMEOUT, bounded},
};
use crate::{error::ApplicationError, ports::DraftStorePort};

/// Default number of drafts examined per sweep
pub const DEFAULT_SWEEP_BATCH: u32 = 100;

/// What a sweep reclaims
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationPolicy {
    pub batch_size: u32,
    /// Keep at most this many drafts per user, least recently accessed go first
    pub max_drafts_per_user: Option<u32>,
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SWEEP_BATCH,
            max_drafts_per_user: None,
        }
    }
}

/// Counts from one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired drafts found
    pub expired_found: usize,
    /// Expired drafts this sweep removed
    pub expired_deleted: usize,
    /// Drafts removed for exceeding the per-user cap
    pub over_cap_deleted: usize,
    /// Candidates already removed or refreshed by someone else
    pub skipped: usize,
    /// Candidates whose deletion failed
    pub failed: usize,
    /// A full batch was found, more may remain
    pub has_more: bool,
}

impl SweepReport {
    pub const fn deleted(&self) -> usize {
        self.expired_deleted + self.over_cap_deleted
    }
}

/// Periodic reclamation of expired drafts
pub struct ExpirationManager {
    drafts: Arc<dyn DraftStorePort>,
    audit: AuditWriterHandle,
    policy: ExpirationPolicy,
    timeout: Duration,
}

impl std::fmt::Debug for ExpirationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirationManager")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ExpirationManager {
    pub fn new(
        drafts: Arc<dyn DraftStorePort>,
        audit: AuditWriterHandle,
        policy: ExpirationPolicy,
    ) -> Self {
        Self {
            drafts,
            audit,
            policy,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    /// Run one sweep at `now`
    ///
    /// Only the initial listing can fail the sweep; per-draft failures are
    /// logged and counted.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, ApplicationError> {
        let mut report = SweepReport::default();

        let expired = bounded(
            self.timeout,
            "list expired drafts",
            self.drafts.list_expired(now, self.policy.batch_size),
        )
        .await?;
        report.expired_found = expired.len();
        report.has_more = expired.len() >= self.policy.batch_size as usize;

        for draft in expired {
            match bounded(
                self.timeout,
                "delete expired draft",
                self.drafts.delete_expired(&draft.id, now),
            )
            .await
            {
                Ok(true) => {
                    report.expired_deleted += 1;
                    self.audit.record(DraftAuditRecord::deleted(&draft, None));
                },
                Ok(false) => {
                    debug!(draft_id = %draft.id, "Expired draft already removed or refreshed");
                    report.skipped += 1;
                },
                Err(e) => {
                    warn!(error = %e, draft_id = %draft.id, "Failed to delete expired draft");
                    report.failed += 1;
                },
            }
        }

        if let Some(cap) = self.policy.max_drafts_per_user {
            self.enforce_cap(cap, &mut report).await?;
        }

        if report.deleted() > 0 {
            info!(
                expired_deleted = report.expired_deleted,
                over_cap_deleted = report.over_cap_deleted,
                skipped = report.skipped,
                failed = report.failed,
                "Reclaimed drafts"
            );
        } else {
            debug!("No drafts to reclaim");
        }
        Ok(report)
    }

    async fn enforce_cap(
        &self,
        cap: u32,
        report: &mut SweepReport,
    ) -> Result<(), ApplicationError> {
        let over = bounded(
            self.timeout,
            "list drafts over cap",
            self.drafts.list_over_cap(cap, self.policy.batch_size),
        )
        .await?;
        if over.len() >= self.policy.batch_size as usize {
            report.has_more = true;
        }

        for draft in over {
            match bounded(
                self.timeout,
                "delete draft over cap",
                self.drafts.hard_delete(&draft.id, &draft.owner_id),
            )
            .await
            {
                Ok(removed) => {
                    report.over_cap_deleted += 1;
                    self.audit.record(DraftAuditRecord::deleted(&removed, None));
                },
                Err(ApplicationError::NotFound(_)) => report.skipped += 1,
                Err(e) => {
                    warn!(error = %e, draft_id = %draft.id, "Failed to delete draft over cap");
                    report.failed += 1;
                },
            }
        }
        Ok(())
    }
}
