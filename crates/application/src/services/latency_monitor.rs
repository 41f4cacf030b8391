//! Latency budget monitor
//!
//! Records wall-clock duration and outcome of every public draft operation
//! in a per-operation rolling window, computes percentiles, error rate and
//! budget compliance, and summarises them into a health report.
//!
//! Recording costs one timestamp pair plus a short critical section on the
//! operation's own window. Readers copy the window and never block writers
//! for longer than that copy.

use std::{
    collections::VecDeque,
    fmt,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::ApplicationError;

/// Default rolling window length per operation
pub const DEFAULT_WINDOW_SIZE: usize = 1000;

/// Measured operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Save,
    List,
    Restore,
    Delete,
    BookReconcile,
}

impl Operation {
    /// Every measured operation
    pub const ALL: [Self; 5] = [
        Self::Save,
        Self::List,
        Self::Restore,
        Self::Delete,
        Self::BookReconcile,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::List => "list",
            Self::Restore => "restore",
            Self::Delete => "delete",
            Self::BookReconcile => "book_reconcile",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Save => 0,
            Self::List => 1,
            Self::Restore => 2,
            Self::Delete => 3,
            Self::BookReconcile => 4,
        }
    }

    /// Health score penalty when this operation misses its compliance floor
    const fn compliance_penalty(self) -> u32 {
        match self {
            Self::Save => 20,
            Self::Restore | Self::BookReconcile => 15,
            Self::List | Self::Delete => 10,
        }
    }

    fn suggestion(self) -> &'static str {
        match self {
            Self::Save => "save compliance low: check store write latency and audit queue backlog",
            Self::List => "list compliance low: check the owner/updated_at index and page sizes",
            Self::Restore => "restore compliance low: check reconciliation and catalog lookups",
            Self::Delete => "delete compliance low: check store lock contention",
            Self::BookReconcile => {
                "reconciliation slow: check catalog natural-key index and lock contention"
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    /// Caller-caused (validation, not found, conflict); not an error
    Rejected,
    Failed,
}

impl Outcome {
    /// Classify a result without consuming it
    pub fn of<T>(result: &Result<T, ApplicationError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) if e.is_client_error() => Self::Rejected,
            Err(_) => Self::Failed,
        }
    }
}

/// p95 targets per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyBudgets {
    pub save: Duration,
    pub list: Duration,
    pub restore: Duration,
    pub delete: Duration,
    pub book_reconcile: Duration,
}

impl Default for LatencyBudgets {
    fn default() -> Self {
        Self {
            save: Duration::from_millis(500),
            list: Duration::from_secs(1),
            restore: Duration::from_secs(2),
            delete: Duration::from_secs(1),
            book_reconcile: Duration::from_secs(1),
        }
    }
}

impl LatencyBudgets {
    pub const fn budget(&self, operation: Operation) -> Duration {
        match operation {
            Operation::Save => self.save,
            Operation::List => self.list,
            Operation::Restore => self.restore,
            Operation::Delete => self.delete,
            Operation::BookReconcile => self.book_reconcile,
        }
    }
}

/// Floors and ceilings used by [`LatencyMonitor::health`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    /// Minimum compliance rate for saves
    pub save_min_compliance: f64,
    /// Minimum compliance rate for every other operation
    pub min_compliance: f64,
    /// Maximum error rate for any operation
    pub max_error_rate: f64,
    /// Multiple of the budget above which a sample logs a warning
    pub warn_factor: f64,
    /// Multiple of the budget above which a sample logs an error
    pub critical_factor: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            save_min_compliance: 0.95,
            min_compliance: 0.90,
            max_error_rate: 0.01,
            warn_factor: 1.5,
            critical_factor: 2.0,
        }
    }
}

impl HealthThresholds {
    const fn min_compliance_for(&self, operation: Operation) -> f64 {
        match operation {
            Operation::Save => self.save_min_compliance,
            _ => self.min_compliance,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    duration: Duration,
    outcome: Outcome,
}

#[derive(Debug, Default)]
struct OperationWindow {
    samples: Mutex<VecDeque<Sample>>,
    recorded: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

/// Statistics over one operation's window
#[derive(Debug, Clone, Serialize)]
pub struct OperationStats {
    pub operation: Operation,
    /// Samples currently in the window
    pub samples: usize,
    /// Samples recorded since start
    pub total_recorded: u64,
    pub total_failed: u64,
    pub total_rejected: u64,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub budget: Duration,
    /// Failed samples / window samples
    pub error_rate: f64,
    /// Samples within budget / window samples
    pub compliance_rate: f64,
}

/// Overall health verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Health summary over every operation with samples
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// 0 to 100
    pub score: u32,
    pub violations: Vec<String>,
    pub suggestions: Vec<String>,
    pub operations: Vec<OperationStats>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Per-operation rolling latency windows
pub struct LatencyMonitor {
    budgets: LatencyBudgets,
    thresholds: HealthThresholds,
    window_size: usize,
    windows: [OperationWindow; 5],
}

impl fmt::Debug for LatencyMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatencyMonitor")
            .field("budgets", &self.budgets)
            .field("window_size", &self.window_size)
            .finish_non_exhaustive()
    }
}

impl Default for LatencyMonitor {
    fn default() -> Self {
        Self::new(LatencyBudgets::default(), HealthThresholds::default(), DEFAULT_WINDOW_SIZE)
    }
}

impl LatencyMonitor {
    /// Create a monitor with explicit budgets and thresholds
    pub fn new(budgets: LatencyBudgets, thresholds: HealthThresholds, window_size: usize) -> Self {
        Self {
            budgets,
            thresholds,
            window_size: window_size.max(1),
            windows: Default::default(),
        }
    }

    pub const fn budgets(&self) -> &LatencyBudgets {
        &self.budgets
    }

    /// Run `fut`, record its duration and outcome, and return its result
    /// unchanged
    pub async fn measure<T, F>(&self, operation: Operation, fut: F) -> Result<T, ApplicationError>
    where
        F: Future<Output = Result<T, ApplicationError>>,
    {
        let start = Instant::now();
        let result = fut.await;
        self.record(operation, start.elapsed(), Outcome::of(&result));
        result
    }

    /// Record one sample
    pub fn record(&self, operation: Operation, duration: Duration, outcome: Outcome) {
        let window = &self.windows[operation.index()];
        {
            let mut samples = window.samples.lock();
            if samples.len() >= self.window_size {
                samples.pop_front();
            }
            samples.push_back(Sample { duration, outcome });
        }
        window.recorded.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Outcome::Failed => {
                window.failed.fetch_add(1, Ordering::Relaxed);
            },
            Outcome::Rejected => {
                window.rejected.fetch_add(1, Ordering::Relaxed);
            },
            Outcome::Ok => {},
        }

        let budget = self.budgets.budget(operation);
        let budget_ms = budget.as_secs_f64() * 1000.0;
        let duration_ms = duration.as_secs_f64() * 1000.0;
        if duration_ms > budget_ms * self.thresholds.critical_factor {
            error!(
                operation = %operation,
                duration_ms,
                budget_ms,
                "Operation far exceeded its latency budget"
            );
        } else if duration_ms > budget_ms * self.thresholds.warn_factor {
            warn!(
                operation = %operation,
                duration_ms,
                budget_ms,
                "Operation exceeded its latency budget"
            );
        }
    }

    /// Statistics for one operation's current window
    pub fn stats(&self, operation: Operation) -> OperationStats {
        let window = &self.windows[operation.index()];
        let samples: Vec<Sample> = window.samples.lock().iter().copied().collect();
        let budget = self.budgets.budget(operation);

        let mut durations: Vec<Duration> = samples.iter().map(|s| s.duration).collect();
        durations.sort_unstable();

        let count = samples.len();
        let failed = samples
            .iter()
            .filter(|s| s.outcome == Outcome::Failed)
            .count();
        let within = durations.iter().filter(|d| **d <= budget).count();

        OperationStats {
            operation,
            samples: count,
            total_recorded: window.recorded.load(Ordering::Relaxed),
            total_failed: window.failed.load(Ordering::Relaxed),
            total_rejected: window.rejected.load(Ordering::Relaxed),
            p50: percentile(&durations, 0.50),
            p95: percentile(&durations, 0.95),
            p99: percentile(&durations, 0.99),
            budget,
            error_rate: ratio(failed, count),
            compliance_rate: if count == 0 { 1.0 } else { ratio(within, count) },
        }
    }

    /// Evaluate every operation that has samples
    pub fn health(&self) -> HealthReport {
        let mut violations = Vec::new();
        let mut suggestions = Vec::new();
        let mut penalty: u32 = 0;
        let mut operations = Vec::new();

        for operation in Operation::ALL {
            let stats = self.stats(operation);
            if stats.samples == 0 {
                continue;
            }

            let floor = self.thresholds.min_compliance_for(operation);
            if stats.compliance_rate < floor {
                violations.push(format!(
                    "{operation} compliance {:.1}% below {:.1}% (budget {} ms)",
                    stats.compliance_rate * 100.0,
                    floor * 100.0,
                    stats.budget.as_millis()
                ));
                suggestions.push(operation.suggestion().to_string());
                penalty += operation.compliance_penalty();
            }

            if stats.error_rate > self.thresholds.max_error_rate {
                violations.push(format!(
                    "{operation} error rate {:.2}% above {:.2}%",
                    stats.error_rate * 100.0,
                    self.thresholds.max_error_rate * 100.0
                ));
                suggestions.push(format!(
                    "{operation} failures elevated: check store availability and timeouts"
                ));
                penalty += 25;
            }

            operations.push(stats);
        }

        HealthReport {
            status: if violations.is_empty() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            },
            score: 100u32.saturating_sub(penalty),
            violations,
            suggestions,
            operations,
        }
    }
}

/// Nearest-rank percentile over sorted durations
fn percentile(sorted: &[Duration], q: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let idx = ((sorted.len() as f64) * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
