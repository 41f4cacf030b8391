//! Application services - Use case implementations

mod audit_writer;
mod book_reconciler;
mod bounded;
mod draft_service;
mod expiration;
mod keyed_locks;
mod latency_monitor;

pub use audit_writer::{
    AuditStatsReader, AuditWriter, AuditWriterHandle, AuditWriterStats,
    DEFAULT_AUDIT_QUEUE_CAPACITY,
};
pub use book_reconciler::{
    BookReconciler, DEFAULT_RECONCILE_BATCH, ReconcileSummary, Reconciliation,
};
pub use bounded::{DEFAULT_STORE_TIMEOUT, bounded};
pub use draft_service::{
    DEFAULT_PAGE_SIZE, DeleteMode, DraftPage, DraftPolicy, DraftService, DraftSummary,
    ListRequest, MAX_PAGE_SIZE, RestoredDraft, SaveRequest,
};
pub use expiration::{DEFAULT_SWEEP_BATCH, ExpirationManager, ExpirationPolicy, SweepReport};
pub use keyed_locks::KeyedLocks;
pub use latency_monitor::{
    DEFAULT_WINDOW_SIZE, HealthReport, HealthStatus, HealthThresholds, LatencyBudgets,
    LatencyMonitor, Operation, OperationStats, Outcome,
};
