//! Latency budget settings.

use std::time::Duration;

use application::{DEFAULT_WINDOW_SIZE, HealthThresholds, LatencyBudgets};
use serde::{Deserialize, Serialize};

/// Per-operation budgets in milliseconds plus health thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    #[serde(default = "default_save_ms")]
    pub save_ms: u64,
    #[serde(default = "default_list_ms")]
    pub list_ms: u64,
    #[serde(default = "default_restore_ms")]
    pub restore_ms: u64,
    #[serde(default = "default_delete_ms")]
    pub delete_ms: u64,
    #[serde(default = "default_book_reconcile_ms")]
    pub book_reconcile_ms: u64,

    /// Samples kept per operation
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Minimum share of saves inside budget
    #[serde(default = "default_save_min_compliance")]
    pub save_min_compliance: f64,

    /// Minimum share of other operations inside budget
    #[serde(default = "default_min_compliance")]
    pub min_compliance: f64,

    /// Maximum share of failed operations
    #[serde(default = "default_max_error_rate")]
    pub max_error_rate: f64,
}

const fn default_save_ms() -> u64 {
    500
}

const fn default_list_ms() -> u64 {
    1000
}

const fn default_restore_ms() -> u64 {
    2000
}

const fn default_delete_ms() -> u64 {
    1000
}

const fn default_book_reconcile_ms() -> u64 {
    1000
}

const fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

const fn default_save_min_compliance() -> f64 {
    0.95
}

const fn default_min_compliance() -> f64 {
    0.90
}

const fn default_max_error_rate() -> f64 {
    0.01
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            save_ms: default_save_ms(),
            list_ms: default_list_ms(),
            restore_ms: default_restore_ms(),
            delete_ms: default_delete_ms(),
            book_reconcile_ms: default_book_reconcile_ms(),
            window_size: default_window_size(),
            save_min_compliance: default_save_min_compliance(),
            min_compliance: default_min_compliance(),
            max_error_rate: default_max_error_rate(),
        }
    }
}

impl LatencyConfig {
    #[must_use]
    pub const fn budgets(&self) -> LatencyBudgets {
        LatencyBudgets {
            save: Duration::from_millis(self.save_ms),
            list: Duration::from_millis(self.list_ms),
            restore: Duration::from_millis(self.restore_ms),
            delete: Duration::from_millis(self.delete_ms),
            book_reconcile: Duration::from_millis(self.book_reconcile_ms),
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            save_min_compliance: self.save_min_compliance,
            min_compliance: self.min_compliance,
            max_error_rate: self.max_error_rate,
            ..HealthThresholds::default()
        }
    }

    pub(super) fn budgets_ms(&self) -> [(&'static str, u64); 5] {
        [
            ("save_ms", self.save_ms),
            ("list_ms", self.list_ms),
            ("restore_ms", self.restore_ms),
            ("delete_ms", self.delete_ms),
            ("book_reconcile_ms", self.book_reconcile_ms),
        ]
    }
}
