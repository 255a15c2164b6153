use anyhow::Result;
use chrono::Local;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::paths;
use crate::store::{self, NewRule};

/// Print every configured rule with its path health, resolved for today.
pub async fn list_rules(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let rules = store::list_rules(&pool).await?;
    let today = Local::now().date_naive();
    let placeholder = &config.engine.date_placeholder;

    println!(
        "{:<4} {:<16} {:<7} {:<9} {:<10} PICKUP",
        "ID", "LOCATION", "ACTIVE", "FREQ MIN", "PICKUP OK"
    );

    for rule in &rules {
        let resolved = paths::resolve_pickup(&rule.pickup_path, placeholder, today);
        let pickup_ok = Path::new(&resolved).is_dir();

        println!(
            "{:<4} {:<16} {:<7} {:<9} {:<10} {}",
            rule.id, rule.location, rule.active, rule.frequency_minutes, pickup_ok, rule.pickup_path
        );
    }

    if rules.is_empty() {
        println!("(no rules configured; add one with `courier rules add`)");
    }

    pool.close().await;
    Ok(())
}

pub async fn add_rule(config: &Config, rule: NewRule) -> Result<()> {
    let pool = db::connect(config).await?;
    let id = store::insert_rule(&pool, &rule).await?;

    println!("Added rule {} ({} -> {})", id, rule.pickup_path, rule.dropoff_path);

    pool.close().await;
    Ok(())
}
