//! Owner identifier value object
//!
//! User ids are issued by the authentication layer and are opaque to this
//! crate, so they are kept as strings rather than parsed into UUIDs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Maximum accepted length of a user identifier
pub const MAX_USER_ID_LEN: usize = 128;

/// An authenticated user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a user ID
    ///
    /// # Errors
    /// Returns an error if the id is blank or longer than [`MAX_USER_ID_LEN`]
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidIdentifier(
                "user id must not be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_USER_ID_LEN {
            return Err(DomainError::InvalidIdentifier(format!(
                "user id longer than {MAX_USER_ID_LEN} bytes"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}
