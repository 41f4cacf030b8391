//! Draft expiration task
//!
//! Periodically removes drafts past their deadline and, when a per-user cap
//! is configured, the least recently accessed drafts beyond it.

use std::{sync::Arc, time::Duration};

use application::ExpirationManager;
use chrono::Utc;
use tracing::{debug, error, info};

use super::DEFAULT_SWEEP_INTERVAL_SECS;

/// Spawn a background task that runs an expiration sweep every `interval`
///
/// The first sweep runs one interval after startup. When a sweep fills a
/// whole batch the next one follows immediately, until the backlog is gone.
///
/// Returns a `JoinHandle` that can be used to abort the task when shutting down.
///
/// # Example
///
/// ```ignore
/// let handle = spawn_draft_expiration_task(manager, None);
///
/// // On shutdown:
/// handle.abort();
/// ```
pub fn spawn_draft_expiration_task(
    manager: Arc<ExpirationManager>,
    interval: Option<Duration>,
) -> tokio::task::JoinHandle<()> {
    let interval = interval.unwrap_or(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));

    info!(
        interval_secs = interval.as_secs(),
        batch_size = manager.policy().batch_size,
        max_drafts_per_user = ?manager.policy().max_drafts_per_user,
        "Starting draft expiration task"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Don't run immediately on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;

            loop {
                match manager.sweep(Utc::now()).await {
                    Ok(report) => {
                        if report.deleted() > 0 || report.failed > 0 {
                            info!(
                                expired_deleted = report.expired_deleted,
                                over_cap_deleted = report.over_cap_deleted,
                                skipped = report.skipped,
                                failed = report.failed,
                                "Draft expiration sweep finished"
                            );
                        } else {
                            debug!("No expired drafts to remove");
                        }
                        if !report.has_more || report.deleted() == 0 {
                            break;
                        }
                    },
                    Err(e) => {
                        error!(error = %e, "Draft expiration sweep failed");
                        break;
                    },
                }
            }
        }
    })
}
