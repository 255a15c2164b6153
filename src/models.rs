//! Core data models used throughout Batch Courier.
//!
//! These types represent the watch rules, ledger rows, and audit records that
//! flow through the live and recovery sweeps.

/// One monitored pickup/dropoff pair and its naming/scheduling policy.
///
/// `pickup_path` may contain the literal date placeholder configured in
/// `[engine]`; `naming_scheme` may contain `date_token` (a chrono format
/// string) which is substituted at copy time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WatchRule {
    pub id: i64,
    pub location: String,
    pub pickup_path: String,
    pub dropoff_path: String,
    pub naming_scheme: Option<String>,
    pub date_token: Option<String>,
    pub frequency_minutes: i64,
    /// Unix seconds of the most recent attempt; 0 means never run.
    pub last_run_at: i64,
    pub active: bool,
}

impl WatchRule {
    /// Whether the destination filename is rebuilt from the naming scheme.
    pub fn renames(&self) -> bool {
        matches!((&self.naming_scheme, &self.date_token), (Some(s), Some(t)) if !s.is_empty() && !t.is_empty())
    }
}

/// Ledger row recording one copied file. Uniqueness is (rule_id, filename):
/// a name already recorded for a rule is never copied again.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProcessedFile {
    pub id: i64,
    pub rule_id: i64,
    pub filename: String,
    pub renamed_to: Option<String>,
    pub copied_at: i64,
}

/// Per-batch audit row: created when a non-empty batch is discovered, then
/// patched in place with the copied count after the copy loop.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunCount {
    pub id: i64,
    pub pickup_path: String,
    pub discovered: i64,
    pub copied: i64,
    pub inserted_at: i64,
}

/// Append-only operator-facing log row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OpLog {
    pub id: i64,
    pub message: String,
    pub category: String,
    pub inserted_at: i64,
}

/// Category tag for [`OpLog`] rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Message,
    Error,
    /// Emitted when the midnight search-window shift is in effect.
    Midnight,
}

impl LogCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            LogCategory::Message => "message",
            LogCategory::Error => "error",
            LogCategory::Midnight => "midnight",
        }
    }
}

/// Outcome of a single lock-aware copy attempt.
///
/// Hard I/O failures are reported as errors, not as a variant; the two
/// benign conditions here must never abort a live run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The file landed at the dropoff under `dest_name`.
    Copied { dest_name: String },
    /// The source is open for exclusive access elsewhere; retried next run.
    StillLocked,
    /// The source vanished between selection and copy.
    SourceMissing,
}
