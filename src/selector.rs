//! Candidate-file selection.
//!
//! Lists the immediate entries of a resolved pickup directory, keeping files
//! whose name matches the rule's location glob and whose creation date falls
//! on the target calendar day. The caller is responsible for checking that
//! the directory exists first; an absent pickup folder before business
//! hours is expected, and only the caller knows whether to treat it as
//! benign.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use globset::GlobMatcher;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Non-recursive listing of `dir`, name-filtered by `matcher` and
/// date-filtered to files created on `target_date`. Output is sorted by
/// file name for deterministic ordering.
pub fn list_candidates(
    dir: &Path,
    matcher: &GlobMatcher,
    target_date: NaiveDate,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Pickup directory is unavailable: {}", dir.display());
    }

    let mut candidates = Vec::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list pickup directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }

        let name = entry.file_name();
        if !matcher.is_match(Path::new(&name)) {
            continue;
        }

        if creation_date(&meta) != target_date {
            continue;
        }

        candidates.push(entry.path());
    }

    candidates.sort();

    Ok(candidates)
}

/// Creation timestamp of a directory entry. Filesystems without birth-time
/// support fall back to the modification time.
pub fn creation_time(meta: &Metadata) -> SystemTime {
    meta.created()
        .or_else(|_| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Creation timestamp reduced to a local calendar day.
pub fn creation_date(meta: &Metadata) -> NaiveDate {
    DateTime::<Local>::from(creation_time(meta)).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::GlobBuilder;

    fn matcher(pattern: &str) -> GlobMatcher {
        GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap()
            .compile_matcher()
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    #[test]
    fn test_name_filter_applies() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("run-atmc-1.dat"), b"a").unwrap();
        std::fs::write(tmp.path().join("run-atmc-2.dat"), b"b").unwrap();
        std::fs::write(tmp.path().join("run-itmc-1.dat"), b"c").unwrap();

        let found = list_candidates(tmp.path(), &matcher("*atmc*"), today()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.to_string_lossy().contains("atmc")));
    }

    #[test]
    fn test_listing_is_non_recursive() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("top.dat"), b"a").unwrap();
        let sub = tmp.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("deep.dat"), b"b").unwrap();

        let found = list_candidates(tmp.path(), &matcher("*"), today()).unwrap();
        assert_eq!(found, vec![tmp.path().join("top.dat")]);
    }

    #[test]
    fn test_date_filter_excludes_other_days() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("fresh.dat"), b"a").unwrap();

        let yesterday = today().pred_opt().unwrap();
        let found = list_candidates(tmp.path(), &matcher("*"), yesterday).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_directory_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gone = tmp.path().join("not-there");
        let err = list_candidates(&gone, &matcher("*"), today()).unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_output_sorted_by_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.dat"), b"b").unwrap();
        std::fs::write(tmp.path().join("a.dat"), b"a").unwrap();
        std::fs::write(tmp.path().join("c.dat"), b"c").unwrap();

        let found = list_candidates(tmp.path(), &matcher("*"), today()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.dat", "b.dat", "c.dat"]);
    }
}
