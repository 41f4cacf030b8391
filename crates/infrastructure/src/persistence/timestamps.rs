//! Timestamp and JSON column codecs
//!
//! Timestamps are written as fixed-width RFC 3339 UTC text with microsecond
//! precision, so comparing the text compares the instants.

use application::error::ApplicationError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, de::DeserializeOwned};

/// Encode a timestamp for storage
pub fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp
pub fn from_db_time(value: &str) -> Result<DateTime<Utc>, ApplicationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApplicationError::Internal(format!("Invalid stored timestamp '{value}': {e}")))
}

/// Encode an optional value as a JSON column
pub fn to_json_column<T: Serialize>(value: Option<&T>) -> Result<Option<String>, ApplicationError> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ApplicationError::Internal(format!("Failed to encode JSON column: {e}")))
}

/// Decode an optional JSON column
pub fn from_json_column<T: DeserializeOwned>(
    value: Option<&str>,
) -> Result<Option<T>, ApplicationError> {
    value
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| ApplicationError::Internal(format!("Failed to decode JSON column: {e}")))
}
