//! # Batch Courier CLI (`courier`)
//!
//! The `courier` binary is the operational interface for Batch Courier. It
//! provides commands for ledger initialization, watch-rule management, the
//! timer-driven live host, one-shot recovery sweeps, and a read-only stats
//! summary.
//!
//! ## Usage
//!
//! ```bash
//! courier --config ./config/courier.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `courier init` | Create the SQLite ledger and run schema migrations |
//! | `courier rules list` | Show configured watch rules and pickup health |
//! | `courier rules add` | Insert a watch rule |
//! | `courier run` | Run the live sweep host on the configured interval |
//! | `courier run --once` | Run exactly one live sweep and exit |
//! | `courier recover` | Bulk-copy a historical date range |
//! | `courier stats` | Ledger and audit overview |

mod alert;
mod config;
mod copier;
mod db;
mod engine;
mod locations;
mod migrate;
mod models;
mod paths;
mod recovery;
mod rules;
mod selector;
mod stats;
mod store;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Batch Courier — a schedule-driven pickup/dropoff engine for
/// externally-produced batch files.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/courier.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "courier",
    about = "Batch Courier — a schedule-driven pickup/dropoff engine for batch files",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/courier.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the ledger database.
    ///
    /// Creates the SQLite file and all required tables (watch_rules,
    /// processed_files, run_counts, op_logs). Idempotent — running it
    /// multiple times is safe.
    Init,

    /// Manage watch rules.
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Run the live sweep host.
    ///
    /// Invokes the engine once per configured interval. At most one sweep is
    /// in flight at a time; a tick that fires mid-sweep is dropped, not
    /// queued. The process exits non-zero as soon as a sweep reports
    /// failure, leaving the restart decision to the service manager.
    ///
    /// When `[recovery] enabled = true` in the config, a single recovery
    /// sweep runs instead of the live loop.
    Run {
        /// Run exactly one sweep and exit.
        #[arg(long)]
        once: bool,
    },

    /// Bulk-copy a historical date range (recovery mode).
    ///
    /// Ignores frequency gates and sweeps every active rule over the
    /// configured window, preserving each file's historical date in its
    /// destination name. Any locked or missing source halts the sweep.
    Recover {
        /// Inclusive start date (YYYY-MM-DD); overrides recovery.beginning.
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Exclusive end date (YYYY-MM-DD); overrides recovery.ending.
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Ledger and audit overview.
    Stats,
}

/// Watch-rule management subcommands.
#[derive(Subcommand)]
enum RulesAction {
    /// Show configured rules and whether their pickup paths resolve today.
    List,

    /// Insert a watch rule.
    Add {
        /// Location category (selects the name glob and date-offset policy).
        #[arg(long)]
        location: String,

        /// Pickup directory; may contain the date placeholder (YYYYMMDD).
        #[arg(long)]
        pickup: String,

        /// Dropoff directory.
        #[arg(long)]
        dropoff: String,

        /// Destination-name template containing the date token.
        #[arg(long)]
        naming_scheme: Option<String>,

        /// chrono format string appearing literally in the naming scheme
        /// (e.g. %Y%m%d%H%M%S).
        #[arg(long)]
        date_token: Option<String>,

        /// Minimum minutes between sweeps of this rule.
        #[arg(long, default_value_t = 5)]
        frequency: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Ledger database initialized successfully.");
        }
        Commands::Rules { action } => match action {
            RulesAction::List => {
                rules::list_rules(&cfg).await?;
            }
            RulesAction::Add {
                location,
                pickup,
                dropoff,
                naming_scheme,
                date_token,
                frequency,
            } => {
                rules::add_rule(
                    &cfg,
                    store::NewRule {
                        location,
                        pickup_path: pickup,
                        dropoff_path: dropoff,
                        naming_scheme,
                        date_token,
                        frequency_minutes: frequency,
                    },
                )
                .await?;
            }
        },
        Commands::Run { once } => {
            run_host(&cfg, once).await?;
        }
        Commands::Recover { from, to } => {
            run_recovery_once(&cfg, from, to).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

/// The trigger host: one engine invocation per interval tick, stopping the
/// process when a sweep fails. Failures that escape the engine are reported
/// over the alert channel here, at the run boundary, before exiting.
async fn run_host(cfg: &config::Config, once: bool) -> Result<()> {
    if cfg.recovery.enabled {
        info!("recovery mode enabled; running a single recovery sweep");
        return run_recovery_once(cfg, None, None).await;
    }

    let pool = db::connect(cfg).await?;
    let alerts = alert::AlertClient::new(cfg.alerts.clone())?;

    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.engine.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let ok = match engine::run_live(cfg, &pool, &alerts).await {
            Ok(ok) => ok,
            Err(e) => {
                alerts
                    .send(
                        alert::Severity::Error,
                        &format!("Error in live sweep: {:#}", e),
                        true,
                    )
                    .await;
                return Err(e);
            }
        };

        if !ok {
            bail!("live sweep failed; stopping host");
        }

        info!("live sweep completed successfully");

        if once {
            break;
        }
    }

    pool.close().await;
    Ok(())
}

async fn run_recovery_once(
    cfg: &config::Config,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let mut recovery_cfg = cfg.recovery.clone();
    if from.is_some() {
        recovery_cfg.beginning = from;
    }
    if to.is_some() {
        recovery_cfg.ending = to;
    }
    let window = recovery_cfg.window()?;

    let pool = db::connect(cfg).await?;
    let alerts = alert::AlertClient::new(cfg.alerts.clone())?;

    let mut cfg = cfg.clone();
    cfg.recovery = recovery_cfg;

    let ok = match recovery::run_recovery(&cfg, &pool, &alerts, window).await {
        Ok(ok) => ok,
        Err(e) => {
            alerts
                .send(
                    alert::Severity::Error,
                    &format!("Error in recovery sweep: {:#}", e),
                    true,
                )
                .await;
            return Err(e);
        }
    };

    if !ok {
        bail!("recovery sweep aborted; inspect the operator log");
    }

    println!("Recovery sweep complete.");

    pool.close().await;
    Ok(())
}
