//! Draft lifecycle settings: retention, content limits, audit queue and
//! the background sweeps.

use std::time::Duration;

use application::{DraftPolicy, ExpirationPolicy};
use domain::{
    ContentLimits, DEFAULT_RETENTION_DAYS,
    content::{
        DEFAULT_MAX_CONTENT_BYTES, DEFAULT_MAX_METADATA_BYTES, DEFAULT_MAX_TITLE_CHARS,
        DEFAULT_MIN_TEXT_CHARS,
    },
};
use serde::{Deserialize, Serialize};

/// Draft retention and content rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftsConfig {
    /// Days a draft lives after its last write
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Upper bound on raw content size in bytes
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,

    /// Minimum visible characters after markup is stripped
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,

    /// Upper bound on serialised metadata size in bytes
    #[serde(default = "default_max_metadata_bytes")]
    pub max_metadata_bytes: usize,

    /// Bound on each store call, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Keep at most this many drafts per user (disabled when unset)
    #[serde(default)]
    pub max_drafts_per_user: Option<u32>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS as u32
}

const fn default_max_content_bytes() -> usize {
    DEFAULT_MAX_CONTENT_BYTES
}

const fn default_min_text_chars() -> usize {
    DEFAULT_MIN_TEXT_CHARS
}

const fn default_max_title_chars() -> usize {
    DEFAULT_MAX_TITLE_CHARS
}

const fn default_max_metadata_bytes() -> usize {
    DEFAULT_MAX_METADATA_BYTES
}

const fn default_store_timeout_ms() -> u64 {
    5000
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            max_content_bytes: default_max_content_bytes(),
            min_text_chars: default_min_text_chars(),
            max_title_chars: default_max_title_chars(),
            max_metadata_bytes: default_max_metadata_bytes(),
            store_timeout_ms: default_store_timeout_ms(),
            max_drafts_per_user: None,
        }
    }
}

impl DraftsConfig {
    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    #[must_use]
    pub const fn limits(&self) -> ContentLimits {
        ContentLimits {
            max_content_bytes: self.max_content_bytes,
            min_text_chars: self.min_text_chars,
            max_title_chars: self.max_title_chars,
            max_metadata_bytes: self.max_metadata_bytes,
        }
    }

    #[must_use]
    pub fn policy(&self) -> DraftPolicy {
        DraftPolicy {
            retention: self.retention(),
            limits: self.limits(),
            store_timeout: self.store_timeout(),
        }
    }
}

/// Audit writer queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Records buffered before new ones are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_queue_capacity() -> usize {
    application::DEFAULT_AUDIT_QUEUE_CAPACITY
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Background expiration and reconciliation sweeps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirationConfig {
    /// Whether the periodic tasks run at all
    #[serde(default = "super::default_true")]
    pub enabled: bool,

    /// Seconds between sweeps
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Expired drafts handled per sweep
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Unlinked drafts reconciled per sweep
    #[serde(default = "default_reconcile_batch_size")]
    pub reconcile_batch_size: u32,
}

const fn default_interval_secs() -> u64 {
    3600
}

const fn default_batch_size() -> u32 {
    application::DEFAULT_SWEEP_BATCH
}

const fn default_reconcile_batch_size() -> u32 {
    application::DEFAULT_RECONCILE_BATCH
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
            reconcile_batch_size: default_reconcile_batch_size(),
        }
    }
}

impl ExpirationConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Sweep policy, taking the per-user cap from the draft settings
    #[must_use]
    pub const fn policy(&self, drafts: &DraftsConfig) -> ExpirationPolicy {
        ExpirationPolicy {
            batch_size: self.batch_size,
            max_drafts_per_user: drafts.max_drafts_per_user,
        }
    }
}
