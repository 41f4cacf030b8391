//! Draft lifecycle status

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Lifecycle status of a review draft
///
/// Hard deletion removes the record entirely, so there is no status for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    /// Active and editable
    #[default]
    Draft,
    /// Soft-deleted: hidden from listings, still readable by id
    Abandoned,
}

impl DraftStatus {
    /// Storage representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Abandoned => "ABANDONED",
        }
    }

    /// Whether drafts in this status appear in default listings
    pub const fn is_listed(&self) -> bool {
        matches!(self, Self::Draft)
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "ABANDONED" => Ok(Self::Abandoned),
            other => Err(DomainError::ValidationError(format!(
                "unknown draft status: {other}"
            ))),
        }
    }
}
