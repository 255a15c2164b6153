//! Live-mode run orchestration.
//!
//! One invocation sweeps every active watch rule in sequence: frequency
//! gate, path validation, search-window selection, dedup, lock-aware copy,
//! then ledger/audit/log recording. Failure handling is deliberately
//! asymmetric: a missing pickup folder or a still-locked file affects only
//! its own rule, while a hard copy failure aborts the whole run, since that
//! usually means a systemic problem (disk full, permissions) rather than a
//! transient per-file condition.

use anyhow::Result;
use chrono::{DateTime, Duration, Local};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::alert::{AlertClient, Severity};
use crate::config::Config;
use crate::copier;
use crate::locations::{self, LocationTable};
use crate::models::{CopyOutcome, LogCategory, WatchRule};
use crate::paths;
use crate::selector;
use crate::store;

/// One live sweep. Returns `Ok(true)` when every rule processed without a
/// fatal condition (trivially true for zero active rules) and `Ok(false)`
/// after a fatal condition has been logged and alerted. `Err` only escapes
/// for failures this function could not report itself; the caller alerts at
/// the run boundary.
pub async fn run_live(config: &Config, pool: &SqlitePool, alerts: &AlertClient) -> Result<bool> {
    run_live_at(config, pool, alerts, Local::now()).await
}

/// Sweep with an explicit wall-clock instant. The instant drives the
/// frequency gate, the path-template date, and the search window; the
/// per-file copy stamp still uses the actual copy time.
pub async fn run_live_at(
    config: &Config,
    pool: &SqlitePool,
    alerts: &AlertClient,
    now: DateTime<Local>,
) -> Result<bool> {
    let table = LocationTable::build(&config.locations)?;
    let rules = store::active_rules(pool).await?;

    info!("starting live sweep over {} active rule(s)", rules.len());

    for rule in &rules {
        match process_rule(config, pool, alerts, &table, rule, now).await {
            Ok(true) => {}
            // Fatal; already logged and alerted.
            Ok(false) => return Ok(false),
            Err(e) => {
                // Per-rule recoverable (usually a store write hiccup): the
                // rule is abandoned for this run, the sweep carries on.
                error!("rule {} ({}) failed: {:#}", rule.id, rule.location, e);
                store::log_op(pool, &format!("Error: {:#}", e), LogCategory::Error).await;
                alerts
                    .send(
                        Severity::Error,
                        &format!("Error processing rule {} ({}): {:#}", rule.id, rule.location, e),
                        true,
                    )
                    .await;
            }
        }
    }

    Ok(true)
}

/// Process a single rule. `Ok(true)` continues the run, `Ok(false)` aborts
/// it (fatal condition, already reported), `Err` is a per-rule recoverable
/// condition the caller logs.
async fn process_rule(
    config: &Config,
    pool: &SqlitePool,
    alerts: &AlertClient,
    table: &LocationTable,
    rule: &WatchRule,
    now: DateTime<Local>,
) -> Result<bool> {
    // Gated: frequency not yet elapsed. No ledger or timestamp touch.
    if now.timestamp() - rule.last_run_at <= rule.frequency_minutes * 60 {
        debug!("rule {} gated ({} min frequency)", rule.id, rule.frequency_minutes);
        return Ok(true);
    }

    let placeholder = &config.engine.date_placeholder;
    let templated = paths::is_templated(&rule.pickup_path, placeholder);
    let today = now.date_naive();

    // PathCheck
    let pickup_dir = if templated {
        let resolved = PathBuf::from(paths::resolve_pickup(&rule.pickup_path, placeholder, today));
        if !resolved.is_dir() {
            // The dated folder is only created once files arrive; before
            // business hours its absence is expected and not worth an alert.
            store::touch_last_run(pool, rule.id).await?;
            return Ok(true);
        }
        resolved
    } else {
        let pickup = PathBuf::from(&rule.pickup_path);
        if !pickup.is_dir() {
            let msg = format!("Source pickup path does not exist: {}", rule.pickup_path);
            store::log_op(pool, &msg, LogCategory::Error).await;
            alerts.send(Severity::Error, &msg, true).await;
            store::touch_last_run(pool, rule.id).await?;
            return Ok(true);
        }
        if !Path::new(&rule.dropoff_path).is_dir() {
            let msg = format!("Source drop off path does not exist: {}", rule.dropoff_path);
            store::log_op(pool, &msg, LogCategory::Error).await;
            alerts.send(Severity::Error, &msg, true).await;
            store::touch_last_run(pool, rule.id).await?;
            return Ok(true);
        }
        pickup
    };

    // Selecting: search-window policy feeds the target date. Templated
    // pickups are already date-scoped by the folder itself and always use
    // the normal offset and a catch-all name filter.
    let (normal, delayed) = locations::search_offsets(now.time());
    let profile = table.profile(&rule.location);
    let offset = if !templated && profile.delayed { delayed } else { normal };
    let target_date = today + Duration::days(offset);

    if normal != 0 {
        store::log_op(
            pool,
            &format!(
                "Attempting to copy files from the previous day for {}",
                rule.location
            ),
            LogCategory::Midnight,
        )
        .await;
    }

    let matcher = if templated {
        &table.catch_all().matcher
    } else {
        &profile.matcher
    };
    let candidates = selector::list_candidates(&pickup_dir, matcher, target_date)?;

    // Deduping
    let fresh = store::filter_unprocessed(pool, rule.id, &candidates).await?;

    if fresh.is_empty() {
        store::touch_last_run(pool, rule.id).await?;
        store::log_op(
            pool,
            &format!("No new files to pick up for {}", rule.location),
            LogCategory::Message,
        )
        .await;
        return Ok(true);
    }

    // Copying
    let count_id = store::insert_run_count(pool, &pickup_dir, fresh.len() as i64).await?;
    let dropoff = Path::new(&rule.dropoff_path);
    let mut copied = 0i64;

    for source in &fresh {
        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let dest_name = copier::dest_filename(rule, templated, &filename, Local::now());
        let dest = dropoff.join(&dest_name);

        match copier::copy_with_spacing(source, &dest).await {
            Ok(CopyOutcome::Copied { dest_name }) => {
                let renamed = if dest_name != filename {
                    Some(dest_name.as_str())
                } else {
                    None
                };
                store::record_processed(pool, rule.id, &filename, renamed).await?;
                store::log_op(
                    pool,
                    &format!(
                        "File {} has been copied to {} for {}",
                        filename,
                        dest.display(),
                        rule.location
                    ),
                    LogCategory::Message,
                )
                .await;
                copied += 1;
            }
            Ok(CopyOutcome::StillLocked) => {
                // Still being written elsewhere; stays a candidate next run.
                debug!("{} is locked; retrying on a later run", source.display());
                store::log_op(
                    pool,
                    &format!("Source file is locked, will retry: {}", source.display()),
                    LogCategory::Message,
                )
                .await;
            }
            Ok(CopyOutcome::SourceMissing) => {
                let msg = format!("Source file does not exist: {}", source.display());
                store::log_op(pool, &msg, LogCategory::Error).await;
                alerts.send(Severity::Error, &msg, true).await;
            }
            Err(e) => {
                let msg = format!(
                    "Can't copy file. Details: filename: {}, source: {}, destination: {}: {:#}",
                    filename, rule.pickup_path, rule.dropoff_path, e
                );
                error!("{}", msg);
                store::log_op(pool, &msg, LogCategory::Error).await;
                alerts.send(Severity::Error, &msg, true).await;
                return Ok(false);
            }
        }
    }

    // Recording
    store::set_run_count_copied(pool, count_id, copied).await?;
    store::touch_last_run(pool, rule.id).await?;
    store::log_op(
        pool,
        &format!("{} file(s) were copied to {}", copied, rule.dropoff_path),
        LogCategory::Message,
    )
    .await;
    store::log_op(
        pool,
        &format!("File transfer complete for {}", rule.location),
        LogCategory::Message,
    )
    .await;

    Ok(true)
}
