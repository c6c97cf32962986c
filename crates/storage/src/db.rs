use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;

use cardwise_categorize::LearnedPattern;
use cardwise_core::Category;
use cardwise_parse::{ProcessingRecord, ProcessingStatus};

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_patterns (
            user_id TEXT NOT NULL,
            category TEXT NOT NULL,
            pattern TEXT NOT NULL,
            confidence REAL NOT NULL,
            hits INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (user_id, category, pattern)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processing_status (
            key TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            detail TEXT,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// ── User patterns ─────────────────────────────────────────────────────────────

/// Load one user's learned patterns, best-ranked first. Rows whose stored
/// category no longer parses are dropped rather than failing the load.
pub async fn load_user_patterns(
    pool: &DbPool,
    user_id: &str,
) -> Result<Vec<LearnedPattern>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT category, pattern, confidence, hits FROM user_patterns \
         WHERE user_id = ? ORDER BY confidence * hits DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let patterns = rows
        .into_iter()
        .filter_map(|row| {
            let category: String = row.get("category");
            let category = Category::from_str(&category).ok()?;
            Some(LearnedPattern {
                category,
                pattern: row.get("pattern"),
                confidence: row.get::<f64, _>("confidence") as f32,
                hits: row.get::<i64, _>("hits") as u32,
            })
        })
        .collect();

    Ok(patterns)
}

/// Replace one user's patterns wholesale. The in-memory store is the live
/// copy; this flushes it for the next run.
pub async fn save_user_patterns(
    pool: &DbPool,
    user_id: &str,
    patterns: &[LearnedPattern],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM user_patterns WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    for p in patterns {
        sqlx::query(
            "INSERT INTO user_patterns (user_id, category, pattern, confidence, hits) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(p.category.to_string())
        .bind(&p.pattern)
        .bind(p.confidence as f64)
        .bind(p.hits as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

// ── Processing status ─────────────────────────────────────────────────────────

pub async fn set_processing_status(
    pool: &DbPool,
    key: &str,
    record: &ProcessingRecord,
) -> Result<(), sqlx::Error> {
    let status = match record.status {
        ProcessingStatus::Processing => "processing",
        ProcessingStatus::Completed => "completed",
        ProcessingStatus::Error => "error",
    };
    sqlx::query(
        "INSERT INTO processing_status (key, status, detail, updated_at) \
         VALUES (?, ?, ?, datetime('now')) \
         ON CONFLICT(key) DO UPDATE SET status = excluded.status, \
         detail = excluded.detail, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(status)
    .bind(&record.detail)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_processing_status(
    pool: &DbPool,
    key: &str,
) -> Result<Option<ProcessingRecord>, sqlx::Error> {
    let row = sqlx::query("SELECT status, detail FROM processing_status WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|row| {
        let status: String = row.get("status");
        let status = match status.as_str() {
            "processing" => ProcessingStatus::Processing,
            "completed" => ProcessingStatus::Completed,
            "error" => ProcessingStatus::Error,
            _ => return None,
        };
        Some(ProcessingRecord {
            status,
            detail: row.get("detail"),
        })
    }))
}
