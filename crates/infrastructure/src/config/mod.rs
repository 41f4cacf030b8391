//! Application configuration
//!
//! Split into focused sub-modules:
//! - `database`: SQLite connection settings
//! - `drafts`: retention, content limits, audit queue, background sweeps
//! - `latency`: per-operation budgets and health thresholds
//! - `logging`: `tracing-subscriber` filter and format
//!
//! Sources are layered: built-in defaults, then an optional `config.toml`
//! (or an explicit file), then `DRAFTKEEP_*` environment variables using
//! `__` between nested keys, e.g. `DRAFTKEEP_DRAFTS__RETENTION_DAYS=14`.

use std::path::Path;

use application::ApplicationError;
use serde::{Deserialize, Serialize};

mod database;
mod drafts;
mod latency;
mod logging;

pub use database::DatabaseConfig;
pub use drafts::{AuditConfig, DraftsConfig, ExpirationConfig};
pub use latency::LatencyConfig;
pub use logging::LoggingConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DRAFTKEEP";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub drafts: DraftsConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub expiration: ExpirationConfig,

    #[serde(default)]
    pub latency: LatencyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from `config.toml` in the working directory (if present) and
    /// the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::build(config::File::with_name("config").required(false))
    }

    /// Load from an explicit file and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        Self::build(config::File::from(path.as_ref()).required(true))
    }

    /// Parse a TOML document without consulting the environment
    pub fn from_toml(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn build<S>(file: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let invalid = |msg: String| Err(ApplicationError::Configuration(msg));

        if self.database.url.trim().is_empty() {
            return invalid("database.url must not be empty".into());
        }
        if self.database.max_connections == 0 {
            return invalid("database.max_connections must be at least 1".into());
        }

        let drafts = &self.drafts;
        if drafts.retention_days == 0 {
            return invalid("drafts.retention_days must be at least 1".into());
        }
        if drafts.min_text_chars > drafts.max_content_bytes {
            return invalid(format!(
                "drafts.min_text_chars ({}) exceeds drafts.max_content_bytes ({})",
                drafts.min_text_chars, drafts.max_content_bytes
            ));
        }
        if drafts.max_title_chars == 0 || drafts.max_metadata_bytes == 0 {
            return invalid("drafts title and metadata limits must be positive".into());
        }
        if drafts.store_timeout_ms == 0 {
            return invalid("drafts.store_timeout_ms must be positive".into());
        }
        if drafts.max_drafts_per_user == Some(0) {
            return invalid("drafts.max_drafts_per_user must be at least 1 when set".into());
        }

        if self.audit.queue_capacity == 0 {
            return invalid("audit.queue_capacity must be at least 1".into());
        }

        let expiration = &self.expiration;
        if expiration.interval_secs == 0 {
            return invalid("expiration.interval_secs must be positive".into());
        }
        if expiration.batch_size == 0 || expiration.reconcile_batch_size == 0 {
            return invalid("expiration batch sizes must be at least 1".into());
        }

        let latency = &self.latency;
        if let Some((name, _)) = latency.budgets_ms().iter().find(|(_, ms)| *ms == 0) {
            return invalid(format!("latency.{name} must be positive"));
        }
        if latency.window_size == 0 {
            return invalid("latency.window_size must be at least 1".into());
        }
        for (name, value) in [
            ("save_min_compliance", latency.save_min_compliance),
            ("min_compliance", latency.min_compliance),
            ("max_error_rate", latency.max_error_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("latency.{name} must be within 0.0..=1.0, got {value}"));
            }
        }

        Ok(())
    }
}
