//! Domain entities - Objects with identity and lifecycle

mod book;
mod draft_audit;
mod review_draft;

pub use book::{BookSnapshot, CatalogBook};
pub use draft_audit::{AuditAction, DraftAuditRecord};
pub use review_draft::{
    DEFAULT_RETENTION_DAYS, DraftInput, DraftPatch, INITIAL_VERSION, ReviewDraft,
};
