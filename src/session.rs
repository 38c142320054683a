//! Session-level operations shared by the CLI and the HTTP server.
//!
//! A session groups the sources parsed from one bibliography with their
//! validation results. Session ids are opaque strings; new sessions get a
//! UUID v4.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;

use citecheck_core::models::Source;
use citecheck_core::report::{build_report, render_csv, render_json, Report};
use citecheck_core::store::ResultStore;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Returns `session_id` if it is non-blank, otherwise a fresh UUID.
pub fn resolve_session_id(session_id: Option<&str>) -> String {
    session_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Stores freshly parsed sources under `session_id`.
pub async fn save_parsed(
    store: &dyn ResultStore,
    session_id: &str,
    sources: &[Source],
    expires_at: i64,
) -> Result<()> {
    if !sources.is_empty() {
        store.put_sources(session_id, sources, expires_at).await?;
    }
    tracing::info!(session_id, count = sources.len(), "stored parsed sources");
    Ok(())
}

/// Builds the report for a session, or `None` if it has no live sources.
pub async fn load_report(store: &dyn ResultStore, session_id: &str) -> Result<Option<Report>> {
    let now = Utc::now();
    let sources = store.get_sources(session_id, now.timestamp()).await?;
    if sources.is_empty() {
        return Ok(None);
    }
    let results = store.get_results(session_id, now.timestamp()).await?;
    Ok(Some(build_report(session_id, sources, results, now)))
}

/// `citecheck report <session>`: writes the report to `output` or stdout.
pub async fn run_report(
    config: &Config,
    session_id: &str,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let Some(report) = load_report(&store, session_id).await? else {
        bail!("no sources found for session {}", session_id);
    };

    let rendered = match format {
        "json" => render_json(&report)?,
        "csv" => render_csv(&report),
        other => bail!("unknown report format: {} (expected json or csv)", other),
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "Report for {} ({} sources) written to {}",
                session_id,
                report.summary.total_sources,
                path.display()
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

/// `citecheck purge`: deletes expired sources and results.
pub async fn run_purge(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let removed = store.purge_expired(Utc::now().timestamp()).await?;
    tracing::info!(removed, "purged expired records");
    println!("Purged {} expired records.", removed);
    Ok(())
}
