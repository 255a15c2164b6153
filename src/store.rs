//! The persistent-store contract.
//!
//! Every read/write the engine performs against SQLite lives here: active
//! watch rules, the processed-file dedup ledger, per-batch audit counts, and
//! the append-only operator log. The engine holds no long-lived rows; each
//! unit of work re-reads what it needs.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{LogCategory, ProcessedFile, WatchRule};

/// Fields for inserting a watch rule (`courier rules add`).
#[derive(Debug, Clone)]
pub struct NewRule {
    pub location: String,
    pub pickup_path: String,
    pub dropoff_path: String,
    pub naming_scheme: Option<String>,
    pub date_token: Option<String>,
    pub frequency_minutes: i64,
}

pub async fn active_rules(pool: &SqlitePool) -> Result<Vec<WatchRule>> {
    let rules = sqlx::query_as::<_, WatchRule>(
        "SELECT * FROM watch_rules WHERE active = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to read active watch rules")?;

    Ok(rules)
}

pub async fn list_rules(pool: &SqlitePool) -> Result<Vec<WatchRule>> {
    let rules = sqlx::query_as::<_, WatchRule>("SELECT * FROM watch_rules ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rules)
}

pub async fn insert_rule(pool: &SqlitePool, rule: &NewRule) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO watch_rules (location, pickup_path, dropoff_path, naming_scheme, date_token, frequency_minutes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&rule.location)
    .bind(&rule.pickup_path)
    .bind(&rule.dropoff_path)
    .bind(&rule.naming_scheme)
    .bind(&rule.date_token)
    .bind(rule.frequency_minutes)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Stamp the rule's last attempt. Called on every attempt that reaches
/// directory validation, found files or not, so retry frequency stays
/// bounded even under persistent error conditions.
pub async fn touch_last_run(pool: &SqlitePool, rule_id: i64) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("UPDATE watch_rules SET last_run_at = ? WHERE id = ?")
        .bind(now)
        .bind(rule_id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to update last run time for rule {}", rule_id))?;

    Ok(())
}

/// The Dedup Filter: drop candidates whose file name is already ledgered for
/// this rule. Preserves input order; pure read, idempotent.
pub async fn filter_unprocessed(
    pool: &SqlitePool,
    rule_id: i64,
    candidates: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let mut fresh = Vec::new();

    for path in candidates {
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        let seen: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM processed_files WHERE rule_id = ? AND filename = ?",
        )
        .bind(rule_id)
        .bind(&filename)
        .fetch_one(pool)
        .await?;

        if seen == 0 {
            fresh.push(path.clone());
        }
    }

    Ok(fresh)
}

/// Append a ledger row for a copied file. `renamed_to` is the destination
/// filename when it differs from the source name.
pub async fn record_processed(
    pool: &SqlitePool,
    rule_id: i64,
    filename: &str,
    renamed_to: Option<&str>,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT INTO processed_files (rule_id, filename, renamed_to, copied_at) VALUES (?, ?, ?, ?)",
    )
    .bind(rule_id)
    .bind(filename)
    .bind(renamed_to)
    .bind(now)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to ledger {} for rule {}", filename, rule_id))?;

    Ok(())
}

/// Ledger rows for a rule, oldest first.
pub async fn processed_for_rule(pool: &SqlitePool, rule_id: i64) -> Result<Vec<ProcessedFile>> {
    let rows = sqlx::query_as::<_, ProcessedFile>(
        "SELECT * FROM processed_files WHERE rule_id = ? ORDER BY id",
    )
    .bind(rule_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn insert_run_count(
    pool: &SqlitePool,
    pickup_path: &Path,
    discovered: i64,
) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        "INSERT INTO run_counts (pickup_path, discovered, inserted_at) VALUES (?, ?, ?)",
    )
    .bind(pickup_path.to_string_lossy().as_ref())
    .bind(discovered)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn set_run_count_copied(pool: &SqlitePool, id: i64, copied: i64) -> Result<()> {
    sqlx::query("UPDATE run_counts SET copied = ? WHERE id = ?")
        .bind(copied)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn insert_op_log(pool: &SqlitePool, message: &str, category: LogCategory) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("INSERT INTO op_logs (message, category, inserted_at) VALUES (?, ?, ?)")
        .bind(message)
        .bind(category.as_str())
        .bind(now)
        .execute(pool)
        .await?;

    Ok(())
}

/// Best-effort op-log append: a store hiccup on a log row must not take the
/// rule down with it.
pub async fn log_op(pool: &SqlitePool, message: &str, category: LogCategory) {
    if let Err(e) = insert_op_log(pool, message, category).await {
        warn!("op-log write failed ({}): {}", category.as_str(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DbConfig};
    use crate::migrate;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config {
            db: DbConfig {
                path: tmp.path().join("courier.sqlite"),
            },
            engine: Default::default(),
            alerts: Default::default(),
            recovery: Default::default(),
            locations: Default::default(),
        };
        migrate::run_migrations(&config).await.unwrap();
        let pool = crate::db::connect(&config).await.unwrap();
        (tmp, pool)
    }

    fn sample_rule() -> NewRule {
        NewRule {
            location: "atm".to_string(),
            pickup_path: "/in".to_string(),
            dropoff_path: "/out".to_string(),
            naming_scheme: None,
            date_token: None,
            frequency_minutes: 5,
        }
    }

    #[tokio::test]
    async fn test_filter_unprocessed_preserves_order() {
        let (_tmp, pool) = test_pool().await;
        let rule_id = insert_rule(&pool, &sample_rule()).await.unwrap();

        record_processed(&pool, rule_id, "b.txt", None).await.unwrap();

        let candidates = vec![
            PathBuf::from("/in/c.txt"),
            PathBuf::from("/in/b.txt"),
            PathBuf::from("/in/a.txt"),
        ];
        let fresh = filter_unprocessed(&pool, rule_id, &candidates).await.unwrap();

        assert_eq!(
            fresh,
            vec![PathBuf::from("/in/c.txt"), PathBuf::from("/in/a.txt")]
        );
    }

    #[tokio::test]
    async fn test_dedup_is_per_rule() {
        let (_tmp, pool) = test_pool().await;
        let first = insert_rule(&pool, &sample_rule()).await.unwrap();
        let second = insert_rule(&pool, &sample_rule()).await.unwrap();

        record_processed(&pool, first, "batch.x937", None).await.unwrap();

        let candidates = vec![PathBuf::from("/in/batch.x937")];
        let fresh = filter_unprocessed(&pool, second, &candidates).await.unwrap();
        assert_eq!(fresh.len(), 1);

        let fresh = filter_unprocessed(&pool, first, &candidates).await.unwrap();
        assert!(fresh.is_empty());
    }

    #[tokio::test]
    async fn test_double_ledger_rejected() {
        let (_tmp, pool) = test_pool().await;
        let rule_id = insert_rule(&pool, &sample_rule()).await.unwrap();

        record_processed(&pool, rule_id, "batch.x937", Some("renamed.x937"))
            .await
            .unwrap();
        let dup = record_processed(&pool, rule_id, "batch.x937", None).await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_active_rules_skips_inactive() {
        let (_tmp, pool) = test_pool().await;
        let rule_id = insert_rule(&pool, &sample_rule()).await.unwrap();
        insert_rule(&pool, &sample_rule()).await.unwrap();

        sqlx::query("UPDATE watch_rules SET active = 0 WHERE id = ?")
            .bind(rule_id)
            .execute(&pool)
            .await
            .unwrap();

        let rules = active_rules(&pool).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_ne!(rules[0].id, rule_id);
    }
}
