//! Location-category table and search-window policy.
//!
//! A rule's `location` discriminator selects its file-name glob and whether
//! its files arrive a day behind (the "return" categories). The table is
//! data-driven: built-in defaults, extended or overridden from
//! `[locations.<name>]` config so new categories are configuration, not code.

use anyhow::{Context, Result};
use chrono::{NaiveTime, Timelike};
use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashMap;

use crate::config::LocationOverride;

/// Built-in category defaults: (location name, glob, delayed).
const DEFAULT_PROFILES: &[(&str, &str, bool)] = &[
    ("bank-return", "*", true),
    ("atm", "*atmc*", false),
    ("itm", "*itmc*", false),
    ("fed-forward", "*FWD*", false),
    ("fed-return", "*RET*", false),
];

/// Catch-all for unrecognized location names.
const FALLBACK_PATTERN: &str = "*";

#[derive(Debug, Clone)]
pub struct LocationProfile {
    pub matcher: GlobMatcher,
    /// Search one extra day into the past (inter-bank batch delay).
    pub delayed: bool,
}

#[derive(Debug, Clone)]
pub struct LocationTable {
    profiles: HashMap<String, LocationProfile>,
    fallback: LocationProfile,
}

impl LocationTable {
    /// Compile the default table plus config overrides. Overrides replace a
    /// default with the same name; new names extend the table.
    pub fn build(overrides: &HashMap<String, LocationOverride>) -> Result<Self> {
        let mut profiles = HashMap::new();

        for (name, pattern, delayed) in DEFAULT_PROFILES {
            profiles.insert(
                name.to_string(),
                LocationProfile {
                    matcher: compile(pattern)?,
                    delayed: *delayed,
                },
            );
        }

        for (name, over) in overrides {
            profiles.insert(
                name.clone(),
                LocationProfile {
                    matcher: compile(&over.pattern)
                        .with_context(|| format!("Bad pattern for location '{}'", name))?,
                    delayed: over.delayed,
                },
            );
        }

        Ok(Self {
            profiles,
            fallback: LocationProfile {
                matcher: compile(FALLBACK_PATTERN)?,
                delayed: false,
            },
        })
    }

    pub fn profile(&self, location: &str) -> &LocationProfile {
        self.profiles.get(location).unwrap_or(&self.fallback)
    }

    /// The match-everything profile, used where no name filter applies.
    pub fn catch_all(&self) -> &LocationProfile {
        &self.fallback
    }
}

/// File names on the pickup shares come from case-blind filesystems; match
/// them case-insensitively.
fn compile(pattern: &str) -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()?
        .compile_matcher())
}

/// Day offsets (normal, delayed) applied to "today" when selecting files.
///
/// Between 00:00 and 01:00 local time every offset shifts one more day into
/// the past: yesterday's batches may not land until just after midnight, and
/// a run at 00:05 looking for files dated "today" would silently drop them.
pub fn search_offsets(local: NaiveTime) -> (i64, i64) {
    if local.hour() == 0 {
        (-1, -2)
    } else {
        (0, -1)
    }
}
