//! # Batch Courier
//!
//! A schedule-driven pickup/dropoff engine for externally-produced batch
//! files (bank cash letters, ATM/ITM captures, return files).
//!
//! Batch Courier sweeps a set of configured watch rules on a timer: each
//! rule names a pickup folder, a dropoff folder, and a naming/scheduling
//! policy. Files are selected by location-specific glob and creation date,
//! deduplicated against a ledger of everything already handled, probed for
//! exclusive locks so half-written files are left alone, then copied and
//! recorded.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────────┐   ┌──────────┐
//! │ Pickup dirs  │──▶│  Engine                    │──▶│ Dropoff   │
//! │ (per rule)   │   │ select → dedup → copy     │   │ dirs      │
//! └──────────────┘   └──────────┬────────────────┘   └──────────┘
//!                               │
//!                  ┌────────────┼────────────┐
//!                  ▼            ▼            ▼
//!             ┌─────────┐ ┌──────────┐ ┌──────────┐
//!             │ SQLite  │ │  Alerts  │ │   CLI    │
//!             │ ledger  │ │ (HTTP)   │ │(courier) │
//!             └─────────┘ └──────────┘ └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! courier init                  # create the ledger database
//! courier rules add --location atm --pickup /mnt/in --dropoff /mnt/out
//! courier run --once            # one live sweep
//! courier run                   # timer-driven host
//! courier recover --from 2024-01-01 --to 2024-02-01
//! courier stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`paths`] | Pickup-path date templating |
//! | [`locations`] | Location-category table and search-window policy |
//! | [`selector`] | Candidate-file selection |
//! | [`copier`] | Lock-aware copying |
//! | [`engine`] | Live-mode run orchestration |
//! | [`recovery`] | Bulk historical recovery sweep |
//! | [`store`] | Persistent-store contract |
//! | [`alert`] | Out-of-band alert delivery |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod alert;
pub mod config;
pub mod copier;
pub mod db;
pub mod engine;
pub mod locations;
pub mod migrate;
pub mod models;
pub mod paths;
pub mod recovery;
pub mod rules;
pub mod selector;
pub mod stats;
pub mod store;
