//! SQLite-backed [`ResultStore`] implementation.
//!
//! Sessions, sources, and results each live in their own table keyed by
//! `(session_id, source_id)`; every write is an upsert, so re-validating a
//! source replaces its previous result. Batch writes run in a single
//! transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use citecheck_core::models::{Source, SourceType, ValidationChecks, ValidationResult};
use citecheck_core::store::ResultStore;

/// SQLite implementation of the [`ResultStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn touch_session(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: &str,
    expires_at: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (session_id, created_at, expires_at)
        VALUES (?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            expires_at = MAX(sessions.expires_at, excluded.expires_at)
        "#,
    )
    .bind(session_id)
    .bind(Utc::now().timestamp())
    .bind(expires_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_sources(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: &str,
    sources: &[Source],
    expires_at: i64,
) -> Result<()> {
    for s in sources {
        sqlx::query(
            r#"
            INSERT INTO sources (session_id, source_id, citation, source_type,
                                 author, year, title, url, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id, source_id) DO UPDATE SET
                citation = excluded.citation,
                source_type = excluded.source_type,
                author = excluded.author,
                year = excluded.year,
                title = excluded.title,
                url = excluded.url,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(session_id)
        .bind(&s.id)
        .bind(&s.citation)
        .bind(s.source_type.as_str())
        .bind(&s.author)
        .bind(s.year)
        .bind(&s.title)
        .bind(&s.url)
        .bind(expires_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn upsert_results(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: &str,
    results: &[ValidationResult],
    expires_at: i64,
) -> Result<()> {
    for r in results {
        sqlx::query(
            r#"
            INSERT INTO results (session_id, source_id, score, is_valid, checks_json,
                                 issues_json, warnings_json, validated_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id, source_id) DO UPDATE SET
                score = excluded.score,
                is_valid = excluded.is_valid,
                checks_json = excluded.checks_json,
                issues_json = excluded.issues_json,
                warnings_json = excluded.warnings_json,
                validated_at = excluded.validated_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(session_id)
        .bind(&r.source_id)
        .bind(i64::from(r.score))
        .bind(r.is_valid)
        .bind(serde_json::to_string(&r.checks)?)
        .bind(serde_json::to_string(&r.issues)?)
        .bind(serde_json::to_string(&r.warnings)?)
        .bind(r.validated_at.timestamp_millis())
        .bind(expires_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn source_from_row(row: &SqliteRow) -> Result<Source> {
    let source_type: String = row.get("source_type");
    Ok(Source {
        id: row.get("source_id"),
        citation: row.get("citation"),
        source_type: source_type.parse::<SourceType>()?,
        author: row.get("author"),
        year: row.get("year"),
        title: row.get("title"),
        url: row.get("url"),
    })
}

fn result_from_row(row: &SqliteRow) -> Result<ValidationResult> {
    let source_id: String = row.get("source_id");
    let score: i64 = row.get("score");
    let checks_json: String = row.get("checks_json");
    let issues_json: String = row.get("issues_json");
    let warnings_json: String = row.get("warnings_json");
    let validated_at: i64 = row.get("validated_at");

    let checks: ValidationChecks = serde_json::from_str(&checks_json)
        .with_context(|| format!("corrupt checks for source {}", source_id))?;

    Ok(ValidationResult {
        score: u32::try_from(score)
            .with_context(|| format!("score out of range for source {}", source_id))?,
        is_valid: row.get("is_valid"),
        checks,
        issues: serde_json::from_str(&issues_json)
            .with_context(|| format!("corrupt issues for source {}", source_id))?,
        warnings: serde_json::from_str(&warnings_json)
            .with_context(|| format!("corrupt warnings for source {}", source_id))?,
        validated_at: DateTime::from_timestamp_millis(validated_at)
            .with_context(|| format!("validated_at out of range for source {}", source_id))?,
        source_id,
    })
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn put_sources(
        &self,
        session_id: &str,
        sources: &[Source],
        expires_at: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        touch_session(&mut tx, session_id, expires_at).await?;
        upsert_sources(&mut tx, session_id, sources, expires_at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn put_results(
        &self,
        session_id: &str,
        results: &[ValidationResult],
        expires_at: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        touch_session(&mut tx, session_id, expires_at).await?;
        upsert_results(&mut tx, session_id, results, expires_at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn put_batch(
        &self,
        session_id: &str,
        sources: &[Source],
        results: &[ValidationResult],
        expires_at: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        touch_session(&mut tx, session_id, expires_at).await?;
        upsert_sources(&mut tx, session_id, sources, expires_at).await?;
        upsert_results(&mut tx, session_id, results, expires_at).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_sources(&self, session_id: &str, now: i64) -> Result<Vec<Source>> {
        let rows = sqlx::query(
            r#"
            SELECT source_id, citation, source_type, author, year, title, url
            FROM sources
            WHERE session_id = ? AND expires_at > ?
            ORDER BY source_id
            "#,
        )
        .bind(session_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(source_from_row).collect()
    }

    async fn get_results(&self, session_id: &str, now: i64) -> Result<Vec<ValidationResult>> {
        let rows = sqlx::query(
            r#"
            SELECT source_id, score, is_valid, checks_json, issues_json,
                   warnings_json, validated_at
            FROM results
            WHERE session_id = ? AND expires_at > ?
            ORDER BY source_id
            "#,
        )
        .bind(session_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(result_from_row).collect()
    }

    async fn purge_expired(&self, now: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let sources = sqlx::query("DELETE FROM sources WHERE expires_at <= ?")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let results = sqlx::query("DELETE FROM results WHERE expires_at <= ?")
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(sources + results)
    }
}
