//! Bulk historical recovery sweep.
//!
//! The alternate entry point: instead of "since last run", copy everything
//! created inside an explicit `[begin, end)` date window, preserving each
//! file's historical date in its destination name. Recovery runs are
//! operator-supervised one-offs, so the failure posture is stricter than
//! live mode: a locked or missing source halts the whole sweep for
//! inspection rather than silently skipping data.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{error, info};

use crate::alert::{AlertClient, Severity};
use crate::config::Config;
use crate::copier;
use crate::locations::LocationTable;
use crate::models::{CopyOutcome, LogCategory, WatchRule};
use crate::paths;
use crate::selector;
use crate::store;

/// Subtrees that were already handled by other processes; anything whose
/// path carries one of these markers is never recovered.
const EXCLUDED_MARKERS: &[&str] = &["archive", "files to send"];

enum SweepStep {
    Continue,
    Abort,
}

/// Sweep every active rule over `[begin, end)`. Frequency gates do not
/// apply. Returns `Ok(true)` only when every rule's file set processed with
/// no locked or missing source.
pub async fn run_recovery(
    config: &Config,
    pool: &SqlitePool,
    alerts: &AlertClient,
    window: (NaiveDate, NaiveDate),
) -> Result<bool> {
    let (begin, end) = window;
    let table = LocationTable::build(&config.locations)?;
    let dropoff_root = config
        .recovery
        .dropoff_root
        .as_deref()
        .context("recovery.dropoff_root is not configured")?;
    let rules = store::active_rules(pool).await?;

    info!(
        "starting recovery sweep [{} .. {}) over {} active rule(s)",
        begin,
        end,
        rules.len()
    );

    for rule in &rules {
        let templated = paths::is_templated(&rule.pickup_path, &config.engine.date_placeholder);

        let step = if templated {
            sweep_buckets(config, pool, alerts, rule, dropoff_root, begin, end).await?
        } else {
            sweep_flat(pool, alerts, &table, rule, dropoff_root, begin, end).await?
        };

        if matches!(step, SweepStep::Abort) {
            return Ok(false);
        }
    }

    store::log_op(
        pool,
        &format!("Recovery sweep complete for [{} .. {})", begin, end),
        LogCategory::Message,
    )
    .await;

    Ok(true)
}

/// Date-templated rules: walk the date-bucketed subfolders of the configured
/// bucket root, then the fixed sub-path keyed by the rule's location name.
/// The date filter happens at the bucket level; inside a bucket every file
/// is taken.
async fn sweep_buckets(
    config: &Config,
    pool: &SqlitePool,
    alerts: &AlertClient,
    rule: &WatchRule,
    dropoff_root: &Path,
    begin: NaiveDate,
    end: NaiveDate,
) -> Result<SweepStep> {
    let bucket_root = config.recovery.bucket_root.as_deref().with_context(|| {
        format!(
            "recovery.bucket_root must be set to recover date-templated rule {}",
            rule.id
        )
    })?;

    let mut buckets = Vec::new();
    let entries = std::fs::read_dir(bucket_root)
        .with_context(|| format!("Failed to list bucket root {}", bucket_root.display()))?;
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_dir() {
            continue;
        }
        let created = selector::creation_date(&meta);
        if created >= begin && created < end {
            buckets.push(entry.path());
        }
    }
    buckets.sort();

    for bucket in &buckets {
        let folder = bucket
            .join(&config.recovery.bucket_subdir)
            .join(&rule.location);
        if !folder.is_dir() {
            continue;
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&folder)? {
            let entry = entry?;
            if entry.metadata()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let fresh = store::filter_unprocessed(pool, rule.id, &files).await?;

        for source in &fresh {
            let meta = std::fs::metadata(source)
                .with_context(|| format!("Failed to stat {}", source.display()))?;
            let filename = file_name_of(source);
            let dest_name = copier::dated_prefix_name(selector::creation_date(&meta), &filename);

            match copy_recovered(pool, alerts, rule, source, dropoff_root, &filename, &dest_name)
                .await?
            {
                SweepStep::Continue => {}
                SweepStep::Abort => return Ok(SweepStep::Abort),
            }
        }
    }

    Ok(SweepStep::Continue)
}

/// Plain rules: location glob over the pickup path, creation date within the
/// window, already-handled subtrees excluded. Destination names come from
/// the naming scheme stamped with the file's own creation date, so recovery
/// preserves historical dates rather than stamping with "now".
async fn sweep_flat(
    pool: &SqlitePool,
    alerts: &AlertClient,
    table: &LocationTable,
    rule: &WatchRule,
    dropoff_root: &Path,
    begin: NaiveDate,
    end: NaiveDate,
) -> Result<SweepStep> {
    let pickup = Path::new(&rule.pickup_path);
    if !pickup.is_dir() {
        let msg = format!("Source pickup path does not exist: {}", rule.pickup_path);
        store::log_op(pool, &msg, LogCategory::Error).await;
        alerts.send(Severity::Error, &msg, true).await;
        return Ok(SweepStep::Abort);
    }

    let profile = table.profile(&rule.location);

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(pickup)
        .with_context(|| format!("Failed to list pickup directory {}", pickup.display()))?
    {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        if !profile.matcher.is_match(Path::new(&entry.file_name())) {
            continue;
        }
        if is_excluded(&entry.path()) {
            continue;
        }
        let created = selector::creation_date(&meta);
        if created >= begin && created < end {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    let fresh = store::filter_unprocessed(pool, rule.id, &candidates).await?;

    for source in &fresh {
        let meta = std::fs::metadata(source)
            .with_context(|| format!("Failed to stat {}", source.display()))?;
        let created: DateTime<Local> = DateTime::from(selector::creation_time(&meta));
        let filename = file_name_of(source);
        let dest_name = if rule.renames() {
            copier::dest_filename(rule, false, &filename, created)
        } else {
            copier::dated_prefix_name(created.date_naive(), &filename)
        };

        match copy_recovered(pool, alerts, rule, source, dropoff_root, &filename, &dest_name)
            .await?
        {
            SweepStep::Continue => {}
            SweepStep::Abort => return Ok(SweepStep::Abort),
        }
    }

    Ok(SweepStep::Continue)
}

/// Copy one recovered file and ledger it. Locked and missing sources abort
/// the sweep; hard copy failures propagate as errors.
async fn copy_recovered(
    pool: &SqlitePool,
    alerts: &AlertClient,
    rule: &WatchRule,
    source: &Path,
    dropoff_root: &Path,
    filename: &str,
    dest_name: &str,
) -> Result<SweepStep> {
    let dest = dropoff_root.join(dest_name);

    match copier::copy_with_spacing(source, &dest).await? {
        CopyOutcome::Copied { dest_name } => {
            let renamed = if dest_name != filename {
                Some(dest_name.as_str())
            } else {
                None
            };
            store::record_processed(pool, rule.id, filename, renamed).await?;
            store::log_op(
                pool,
                &format!(
                    "Recovered {} to {} for {}",
                    filename,
                    dest.display(),
                    rule.location
                ),
                LogCategory::Message,
            )
            .await;
            Ok(SweepStep::Continue)
        }
        CopyOutcome::StillLocked => {
            let msg = format!("Source file is locked: {}", source.display());
            error!("{}; aborting recovery sweep", msg);
            store::log_op(pool, &msg, LogCategory::Error).await;
            alerts.send(Severity::Error, &msg, true).await;
            Ok(SweepStep::Abort)
        }
        CopyOutcome::SourceMissing => {
            let msg = format!("Source file does not exist: {}", source.display());
            error!("{}; aborting recovery sweep", msg);
            store::log_op(pool, &msg, LogCategory::Error).await;
            alerts.send(Severity::Error, &msg, true).await;
            Ok(SweepStep::Abort)
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_excluded(path: &Path) -> bool {
    let lowered = path.to_string_lossy().to_lowercase();
    EXCLUDED_MARKERS.iter().any(|m| lowered.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_markers() {
        assert!(is_excluded(Path::new("/in/Archive/batch.dat")));
        assert!(is_excluded(Path::new("/in/Files to Send/batch.dat")));
        assert!(is_excluded(Path::new("/in/archive-batch.dat")));
        assert!(!is_excluded(Path::new("/in/batch.dat")));
    }
}
