//! Background tasks
//!
//! Periodic loops over the draft store: expiration and book reconciliation.

mod book_reconcile;
mod draft_expiration;

pub use book_reconcile::spawn_book_reconcile_task;
pub use draft_expiration::spawn_draft_expiration_task;

/// Default interval between sweeps: once per hour
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
