//! Lock-aware file copying.
//!
//! External producers write pickup files in place, so a candidate may still
//! be mid-write when a sweep reaches it. The copier probes for exclusive
//! access first (non-blocking, via `fs2`) and reports [`CopyOutcome::StillLocked`]
//! rather than copying a half-written file; the candidate stays eligible for
//! the next run. Uses `ErrorKind::WouldBlock` to discriminate contention,
//! matching fs2's flock/LockFileEx behavior.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::models::{CopyOutcome, WatchRule};

/// Extension producers use for files still being assembled.
const TMP_EXTENSION: &str = "tmp";
/// Canonical extension a finished `.tmp` file is renamed to on dropoff.
const TARGET_EXTENSION: &str = "x937";

/// Compute the destination filename for a candidate.
///
/// Date-templated pickups keep the source name, except `.tmp` sources which
/// swap to the canonical extension. Plain pickups substitute the rule's date
/// token inside its naming scheme with `stamp` formatted by that token; rules
/// without a scheme keep the source name.
pub fn dest_filename(
    rule: &WatchRule,
    templated: bool,
    filename: &str,
    stamp: DateTime<Local>,
) -> String {
    if templated {
        let path = Path::new(filename);
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case(TMP_EXTENSION)) {
            return path
                .with_extension(TARGET_EXTENSION)
                .to_string_lossy()
                .to_string();
        }
        return filename.to_string();
    }

    match (&rule.naming_scheme, &rule.date_token) {
        (Some(scheme), Some(token)) if !scheme.is_empty() && !token.is_empty() => {
            scheme.replace(token, &stamp.format(token).to_string())
        }
        _ => filename.to_string(),
    }
}

/// Destination name used by the recovery sweep's bucketed branch:
/// the file's own creation date prefixed onto the original name.
pub fn dated_prefix_name(date: NaiveDate, filename: &str) -> String {
    format!("{}-{}", date.format("%d-%m-%Y"), filename)
}

/// Probe the source for exclusive access, then copy it to `dest`.
///
/// A short pause precedes the byte copy: files produced in rapid succession
/// and renamed with a second-resolution naming scheme would otherwise collide
/// at the destination. Hard I/O failures are errors; the caller decides how
/// far they escalate.
pub async fn copy_with_spacing(source: &Path, dest: &Path) -> Result<CopyOutcome> {
    let file = match OpenOptions::new().read(true).open(source) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CopyOutcome::SourceMissing),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open source {}", source.display()))
        }
    };

    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            // Probe only; release straight away.
            let _ = FileExt::unlock(&file);
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(CopyOutcome::StillLocked),
        Err(e) => {
            return Err(e).with_context(|| format!("Lock probe failed for {}", source.display()))
        }
    }
    drop(file);

    tokio::time::sleep(Duration::from_secs(1)).await;

    if dest.exists() {
        warn!("Overwriting existing dropoff file {}", dest.display());
    }

    std::fs::copy(source, dest).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            dest.display()
        )
    })?;

    let dest_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(CopyOutcome::Copied { dest_name })
}
