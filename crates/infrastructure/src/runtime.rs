//! Runtime wiring
//!
//! Builds the SQLite adapters, the audit writer, the latency monitor and the
//! services from one [`AppConfig`], and owns the background tasks.

use std::{sync::Arc, time::Duration};

use application::{
    ApplicationError, AuditWriter, AuditWriterHandle, AuditWriterStats, BookReconciler,
    DraftService, ExpirationManager, LatencyMonitor,
};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::{
    config::AppConfig,
    persistence::{
        AsyncDatabase, AsyncDatabaseError, SqliteBookCatalog, SqliteDraftAuditLog,
        SqliteDraftStore,
    },
    tasks::{spawn_book_reconcile_task, spawn_draft_expiration_task},
};

/// How long shutdown waits for queued audit records to be written
const AUDIT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while assembling the runtime
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ApplicationError),

    #[error(transparent)]
    Database(#[from] AsyncDatabaseError),
}

/// Fully wired draft persistence core
pub struct DraftRuntime {
    config: AppConfig,
    database: AsyncDatabase,
    drafts: Arc<SqliteDraftStore>,
    audit_log: Arc<SqliteDraftAuditLog>,
    catalog: Arc<SqliteBookCatalog>,
    monitor: Arc<LatencyMonitor>,
    reconciler: Arc<BookReconciler>,
    expiration: Arc<ExpirationManager>,
    service: Arc<DraftService>,
    audit: AuditWriterHandle,
    audit_worker: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for DraftRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftRuntime")
            .field("database", &self.config.database.url)
            .field("background_tasks", &self.background.len())
            .finish_non_exhaustive()
    }
}

impl DraftRuntime {
    /// Validate `config`, open the database and wire every component
    ///
    /// Background tasks are not started; see [`Self::spawn_background_tasks`].
    #[instrument(skip_all, fields(database = %config.database.url))]
    pub async fn start(config: AppConfig) -> Result<Self, RuntimeError> {
        config.validate()?;

        let database = AsyncDatabase::new(&config.database.connection()).await?;
        if config.database.run_migrations {
            database.migrate().await?;
        }
        let pool = database.pool().clone();

        let drafts = Arc::new(SqliteDraftStore::new(pool.clone(), config.drafts.retention()));
        let audit_log = Arc::new(SqliteDraftAuditLog::new(pool.clone()));
        let catalog = Arc::new(SqliteBookCatalog::new(pool));

        let (audit, audit_worker) =
            AuditWriter::spawn(audit_log.clone(), config.audit.queue_capacity);
        let monitor = Arc::new(LatencyMonitor::new(
            config.latency.budgets(),
            config.latency.thresholds(),
            config.latency.window_size,
        ));

        let store_timeout = config.drafts.store_timeout();
        let reconciler = Arc::new(
            BookReconciler::new(
                drafts.clone(),
                catalog.clone(),
                audit.clone(),
                Arc::clone(&monitor),
            )
            .with_timeout(store_timeout),
        );
        let expiration = Arc::new(
            ExpirationManager::new(
                drafts.clone(),
                audit.clone(),
                config.expiration.policy(&config.drafts),
            )
            .with_timeout(store_timeout),
        );
        let service = Arc::new(DraftService::new(
            drafts.clone(),
            catalog.clone(),
            Arc::clone(&reconciler),
            audit.clone(),
            Arc::clone(&monitor),
            config.drafts.policy(),
        ));

        info!(
            retention_days = config.drafts.retention_days,
            audit_queue = config.audit.queue_capacity,
            "Draft runtime ready"
        );

        Ok(Self {
            config,
            database,
            drafts,
            audit_log,
            catalog,
            monitor,
            reconciler,
            expiration,
            service,
            audit,
            audit_worker,
            background: Vec::new(),
        })
    }

    /// Start the periodic expiration and reconciliation tasks
    ///
    /// Does nothing when `expiration.enabled` is false or the tasks are
    /// already running.
    pub fn spawn_background_tasks(&mut self) {
        if !self.config.expiration.enabled || !self.background.is_empty() {
            return;
        }
        let interval = Some(self.config.expiration.interval());
        self.background.push(spawn_draft_expiration_task(
            Arc::clone(&self.expiration),
            interval,
        ));
        self.background.push(spawn_book_reconcile_task(
            Arc::clone(&self.reconciler),
            self.config.expiration.reconcile_batch_size,
            interval,
        ));
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn database(&self) -> &AsyncDatabase {
        &self.database
    }

    /// Request-facing facade
    pub fn service(&self) -> Arc<DraftService> {
        Arc::clone(&self.service)
    }

    pub fn drafts(&self) -> Arc<SqliteDraftStore> {
        Arc::clone(&self.drafts)
    }

    pub fn audit_log(&self) -> Arc<SqliteDraftAuditLog> {
        Arc::clone(&self.audit_log)
    }

    pub fn catalog(&self) -> Arc<SqliteBookCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn monitor(&self) -> Arc<LatencyMonitor> {
        Arc::clone(&self.monitor)
    }

    pub fn reconciler(&self) -> Arc<BookReconciler> {
        Arc::clone(&self.reconciler)
    }

    pub fn expiration(&self) -> Arc<ExpirationManager> {
        Arc::clone(&self.expiration)
    }

    pub fn audit_stats(&self) -> AuditWriterStats {
        self.audit.stats()
    }

    /// Stop background tasks, flush the audit queue and close the pool
    ///
    /// The flush only completes once every clone of the service handed out
    /// by [`Self::service`] has been dropped; otherwise it gives up after a
    /// bounded wait.
    pub async fn shutdown(self) -> AuditWriterStats {
        let Self {
            database,
            service,
            reconciler,
            expiration,
            audit,
            audit_worker,
            background,
            ..
        } = self;

        for task in &background {
            task.abort();
        }
        for task in background {
            let _ = task.await;
        }

        let stats_reader = audit.stats_reader();
        drop((service, reconciler, expiration, audit));

        let mut audit_worker = audit_worker;
        if tokio::time::timeout(AUDIT_FLUSH_TIMEOUT, &mut audit_worker)
            .await
            .is_err()
        {
            warn!("Audit queue did not drain before shutdown, remaining records are lost");
            audit_worker.abort();
        }

        let stats = stats_reader.stats();
        database.close().await;
        info!(
            written = stats.written,
            dropped = stats.dropped,
            failed = stats.failed,
            "Draft runtime stopped"
        );
        stats
    }
}
