//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod audit_log;
mod book_catalog;
mod draft_store;

pub use audit_log::DraftAuditLogPort;
#[cfg(test)]
pub use audit_log::MockDraftAuditLogPort;
pub use book_catalog::BookCatalogPort;
#[cfg(test)]
pub use book_catalog::MockBookCatalogPort;
pub use draft_store::{
    DraftChange, DraftListQuery, DraftStatistics, DraftStorePort, StoredDraftPage,
};
#[cfg(test)]
pub use draft_store::MockDraftStorePort;
