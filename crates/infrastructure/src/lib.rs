//! Infrastructure layer - Adapters for external systems
//!
//! Implements the application ports on SQLite (sqlx), loads configuration,
//! initialises logging, runs the periodic maintenance tasks and wires the
//! whole draft core together in [`DraftRuntime`].

pub mod config;
pub mod persistence;
pub mod runtime;
pub mod tasks;
pub mod telemetry;

pub use config::{
    AppConfig, AuditConfig, DatabaseConfig, DraftsConfig, ExpirationConfig, LatencyConfig,
    LoggingConfig,
};
pub use persistence::{
    AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError, SqliteBookCatalog,
    SqliteDraftAuditLog, SqliteDraftStore,
};
pub use runtime::{DraftRuntime, RuntimeError};
pub use tasks::{spawn_book_reconcile_task, spawn_draft_expiration_task};
pub use telemetry::{TelemetryError, init_logging};
