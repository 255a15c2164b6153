//! Ledger and audit overview.
//!
//! A quick read-only summary of what the engine has done: rule counts,
//! ledgered files, recent batch audits, and the tail of the operator log.
//! Used by `courier stats` to give confidence that sweeps are running and
//! recording as expected.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::models::{OpLog, RunCount};

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_rules: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watch_rules")
        .fetch_one(&pool)
        .await?;

    let active_rules: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watch_rules WHERE active = 1")
        .fetch_one(&pool)
        .await?;

    let processed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processed_files")
        .fetch_one(&pool)
        .await?;

    let last_copy: Option<i64> = sqlx::query_scalar("SELECT MAX(copied_at) FROM processed_files")
        .fetch_one(&pool)
        .await?;

    println!("Batch Courier — Ledger Stats");
    println!("============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Rules:       {} ({} active)", total_rules, active_rules);
    println!("  Files moved: {}", processed);
    println!(
        "  Last copy:   {}",
        last_copy.map(format_ts).unwrap_or_else(|| "never".to_string())
    );

    let batches = sqlx::query_as::<_, RunCount>(
        "SELECT * FROM run_counts ORDER BY id DESC LIMIT 10",
    )
    .fetch_all(&pool)
    .await?;

    if !batches.is_empty() {
        println!();
        println!("  Recent batches:");
        println!("  {:<19} {:>10} {:>7}   PICKUP", "WHEN", "FOUND", "COPIED");
        for batch in &batches {
            println!(
                "  {:<19} {:>10} {:>7}   {}",
                format_ts(batch.inserted_at),
                batch.discovered,
                batch.copied,
                batch.pickup_path,
            );
        }
    }

    let logs = sqlx::query_as::<_, OpLog>("SELECT * FROM op_logs ORDER BY id DESC LIMIT 10")
        .fetch_all(&pool)
        .await?;

    if !logs.is_empty() {
        println!();
        println!("  Recent log entries:");
        for log in &logs {
            println!(
                "  {:<19} [{}] {}",
                format_ts(log.inserted_at),
                log.category,
                log.message,
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
