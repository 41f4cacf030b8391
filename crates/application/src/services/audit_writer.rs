//! Asynchronous audit writer
//!
//! Mutations hand their audit records to a bounded queue and return
//! immediately. A single background worker drains the queue into the
//! audit log. A full queue drops the record with a warning; a failed append
//! is logged and never retried against the caller.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use domain::DraftAuditRecord;
use serde::Serialize;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::ports::DraftAuditLogPort;

/// Default queue capacity
pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct AuditCounters {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
}

impl AuditCounters {
    fn snapshot(&self) -> AuditWriterStats {
        AuditWriterStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of audit writer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditWriterStats {
    pub enqueued: u64,
    pub dropped: u64,
    pub written: u64,
    pub failed: u64,
}

/// Cloneable, non-blocking sender side of the audit queue
#[derive(Clone)]
pub struct AuditWriterHandle {
    tx: mpsc::Sender<DraftAuditRecord>,
    counters: Arc<AuditCounters>,
}

impl std::fmt::Debug for AuditWriterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditWriterHandle")
            .field("capacity", &self.tx.max_capacity())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl AuditWriterHandle {
    /// Queue a record without waiting
    ///
    /// Returns `true` when the record was queued.
    pub fn record(&self, record: DraftAuditRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            },
            Err(TrySendError::Full(record)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    draft_id = %record.draft_id,
                    action = %record.action,
                    "Audit queue full, dropping record"
                );
                false
            },
            Err(TrySendError::Closed(record)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    draft_id = %record.draft_id,
                    action = %record.action,
                    "Audit writer stopped, dropping record"
                );
                false
            },
        }
    }

    /// Current counters
    pub fn stats(&self) -> AuditWriterStats {
        self.counters.snapshot()
    }

    /// Counter view that does not keep the queue open
    pub fn stats_reader(&self) -> AuditStatsReader {
        AuditStatsReader {
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Read-only access to the writer counters
#[derive(Debug, Clone)]
pub struct AuditStatsReader {
    counters: Arc<AuditCounters>,
}

impl AuditStatsReader {
    pub fn stats(&self) -> AuditWriterStats {
        self.counters.snapshot()
    }
}

/// Background worker that drains the audit queue
#[derive(Debug)]
pub struct AuditWriter;

impl AuditWriter {
    /// Start the worker
    ///
    /// The worker exits once every handle has been dropped and the queue is
    /// drained, so awaiting the join handle after dropping the handles
    /// flushes pending records.
    pub fn spawn(
        log: Arc<dyn DraftAuditLogPort>,
        capacity: usize,
    ) -> (AuditWriterHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<DraftAuditRecord>(capacity.max(1));
        let counters = Arc::new(AuditCounters::default());
        let worker_counters = Arc::clone(&counters);

        let task = tokio::spawn(async move {
            info!(capacity, "Audit writer started");
            while let Some(record) = rx.recv().await {
                match log.append(&record).await {
                    Ok(id) => {
                        worker_counters.written.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            audit_id = id,
                            draft_id = %record.draft_id,
                            action = %record.action,
                            "Audit record written"
                        );
                    },
                    Err(e) => {
                        worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                        error!(
                            error = %e,
                            draft_id = %record.draft_id,
                            action = %record.action,
                            "Failed to write audit record"
                        );
                    },
                }
            }
            info!("Audit writer stopped");
        });

        (AuditWriterHandle { tx, counters }, task)
    }
}
