use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates every table and index if missing. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Create sessions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create sources table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            session_id TEXT NOT NULL,
            source_id TEXT NOT NULL,
            citation TEXT NOT NULL,
            source_type TEXT NOT NULL DEFAULT 'other',
            author TEXT,
            year INTEGER,
            title TEXT,
            url TEXT,
            expires_at INTEGER NOT NULL,
            PRIMARY KEY (session_id, source_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create results table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS results (
            session_id TEXT NOT NULL,
            source_id TEXT NOT NULL,
            score INTEGER NOT NULL,
            is_valid INTEGER NOT NULL,
            checks_json TEXT NOT NULL,
            issues_json TEXT NOT NULL DEFAULT '[]',
            warnings_json TEXT NOT NULL DEFAULT '[]',
            validated_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            PRIMARY KEY (session_id, source_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sources_expires_at ON sources(expires_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_results_expires_at ON results(expires_at)")
        .execute(pool)
        .await?;

    Ok(())
}
