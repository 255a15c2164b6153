use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    // Watch rules: one row per monitored pickup/dropoff pair
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watch_rules (
            id INTEGER PRIMARY KEY,
            location TEXT NOT NULL,
            pickup_path TEXT NOT NULL,
            dropoff_path TEXT NOT NULL,
            naming_scheme TEXT,
            date_token TEXT,
            frequency_minutes INTEGER NOT NULL DEFAULT 5,
            last_run_at INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Processed-file ledger: the dedup key is (rule_id, filename), never content
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processed_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rule_id INTEGER NOT NULL,
            filename TEXT NOT NULL,
            renamed_to TEXT,
            copied_at INTEGER NOT NULL,
            UNIQUE(rule_id, filename),
            FOREIGN KEY (rule_id) REFERENCES watch_rules(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Per-batch audit counts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS run_counts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pickup_path TEXT NOT NULL,
            discovered INTEGER NOT NULL,
            copied INTEGER NOT NULL DEFAULT 0,
            inserted_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Operator-facing log, append-only
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS op_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message TEXT NOT NULL,
            category TEXT NOT NULL,
            inserted_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
