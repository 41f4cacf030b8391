//! draftkeep CLI
//!
//! Maintenance commands for the review draft store: migrations, expiration
//! and reconciliation sweeps, statistics and audit lookups.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use anyhow::Context;
use application::ports::DraftAuditLogPort;
use chrono::Utc;
use clap::{Parser, Subcommand};
use domain::DraftId;
use infrastructure::{AppConfig, AsyncDatabase, DraftRuntime, init_logging};

/// draftkeep CLI
#[derive(Parser)]
#[command(name = "draftkeep-cli")]
#[command(author, version, about = "Review draft store maintenance", long_about = None)]
struct Cli {
    /// Verbosity level (overrides logging.filter)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ./config.toml if present)
    #[arg(short, long, env = "DRAFTKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL, overrides database.url
    #[arg(short, long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Remove expired drafts (and drafts beyond the per-user cap, if set)
    ///
    /// Example: draftkeep-cli sweep --until-done
    Sweep {
        /// Keep sweeping while full batches are found
        #[arg(long)]
        until_done: bool,
    },

    /// Link drafts holding inline book data to catalog entries
    Reconcile {
        /// Drafts to process
        #[arg(short, long, default_value_t = application::DEFAULT_RECONCILE_BATCH)]
        limit: u32,
    },

    /// Print draft statistics as JSON
    Stats,

    /// Print audit records as JSON
    ///
    /// Example: draftkeep-cli audit --draft 6f1c...
    Audit {
        /// Records for one draft, oldest first
        #[arg(long)]
        draft: Option<String>,

        /// Most recent records when no draft is given
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },

    /// Validate and print the effective configuration
    Config,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };
    if let Some(url) = &cli.database {
        config.database.url.clone_from(url);
    }
    if let Some(filter) = log_filter_from_verbosity(cli.verbose) {
        config.logging.filter = filter.to_string();
    }
    // One-shot commands never run the periodic tasks
    config.expiration.enabled = false;
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Migrate => {
            let database = AsyncDatabase::new(&config.database.connection()).await?;
            database.migrate().await?;
            database.close().await;
            println!("✅ Migrations applied to {}", config.database.url);
        },

        Commands::Config => {
            config.validate()?;
            print_json(&config)?;
        },

        Commands::Sweep { until_done } => {
            let runtime = DraftRuntime::start(config).await?;
            let expiration = runtime.expiration();
            let mut total = 0;
            loop {
                let report = expiration.sweep(Utc::now()).await?;
                total += report.deleted();
                print_json(&report)?;
                if !(until_done && report.has_more && report.deleted() > 0) {
                    break;
                }
            }
            drop(expiration);
            let audit = runtime.shutdown().await;
            println!("🧹 Removed {total} draft(s), {} audit record(s) written", audit.written);
        },

        Commands::Reconcile { limit } => {
            let runtime = DraftRuntime::start(config).await?;
            let summary = runtime.reconciler().reconcile_pending(limit).await?;
            print_json(&summary)?;
            runtime.shutdown().await;
        },

        Commands::Stats => {
            let runtime = DraftRuntime::start(config).await?;
            let stats = runtime.service().statistics().await?;
            print_json(&stats)?;
            runtime.shutdown().await;
        },

        Commands::Audit { draft, limit } => {
            let runtime = DraftRuntime::start(config).await?;
            let log = runtime.audit_log();
            let records = match draft {
                Some(raw) => {
                    let id = DraftId::parse(&raw)
                        .with_context(|| format!("invalid draft id {raw}"))?;
                    log.for_draft(&id).await?
                },
                None => log.recent(limit).await?,
            };
            print_json(&records)?;
            drop(log);
            runtime.shutdown().await;
        },
    }

    Ok(())
}
