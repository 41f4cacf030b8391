//! Value Objects - Immutable, identity-less domain primitives

mod book_id;
mod draft_id;
mod draft_status;
mod natural_key;
mod user_id;

pub use book_id::BookId;
pub use draft_id::DraftId;
pub use draft_status::DraftStatus;
pub use natural_key::{NaturalKey, normalize_text};
pub use user_id::{MAX_USER_ID_LEN, UserId};
