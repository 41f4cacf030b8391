//! Domain layer for review drafts
//!
//! Contains the draft entity and its state rules, book snapshots and catalog
//! records, audit records, and the content rules a draft must satisfy.
//! This layer performs no I/O.

pub mod content;
pub mod entities;
pub mod errors;
pub mod value_objects;

pub use content::{ContentLimits, strip_markup, visible_length};
pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
