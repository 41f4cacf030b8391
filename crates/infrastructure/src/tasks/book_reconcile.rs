//! Book reconciliation task
//!
//! Periodically links drafts that still carry an inline book snapshot but no
//! catalog reference.

use std::{sync::Arc, time::Duration};

use application::BookReconciler;
use tracing::{debug, error, info};

use super::DEFAULT_SWEEP_INTERVAL_SECS;

/// Spawn a background task that reconciles up to `batch_size` drafts every
/// `interval`
///
/// Returns a `JoinHandle` that can be used to abort the task when shutting down.
pub fn spawn_book_reconcile_task(
    reconciler: Arc<BookReconciler>,
    batch_size: u32,
    interval: Option<Duration>,
) -> tokio::task::JoinHandle<()> {
    let interval = interval.unwrap_or(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));

    info!(
        interval_secs = interval.as_secs(),
        batch_size, "Starting book reconciliation task"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Don't run immediately on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match reconciler.reconcile_pending(batch_size).await {
                Ok(summary) if summary.scanned > 0 => {
                    info!(
                        scanned = summary.scanned,
                        linked = summary.linked,
                        catalog_created = summary.catalog_created,
                        deferred = summary.deferred,
                        "Book reconciliation sweep finished"
                    );
                },
                Ok(_) => debug!("No drafts awaiting reconciliation"),
                Err(e) => error!(error = %e, "Book reconciliation sweep failed"),
            }
        }
    })
}
