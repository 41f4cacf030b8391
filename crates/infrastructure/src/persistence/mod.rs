//! Persistence module
//!
//! SQLite storage for review drafts, their audit trail and the book catalog.

pub mod async_connection;
pub mod audit_log;
pub mod book_catalog;
pub mod draft_store;
pub mod error;
pub mod timestamps;

pub use async_connection::{AsyncDatabase, AsyncDatabaseConfig, AsyncDatabaseError};
pub use audit_log::SqliteDraftAuditLog;
pub use book_catalog::SqliteBookCatalog;
pub use draft_store::SqliteDraftStore;
pub use error::map_sqlx_error;
