//! Storage abstraction for validation sessions.
//!
//! The [`ResultStore`] trait defines the persistence operations needed by
//! the parse, validate, and report flows, enabling pluggable backends
//! (SQLite in the runtime crate, in-memory here for tests and embedding).
//!
//! Records are keyed by `(session_id, source_id)`. Writes overwrite any
//! earlier record for the same key (last write wins, no history). Every
//! record carries an `expires_at` unix timestamp; reads skip expired records
//! and [`purge_expired`](ResultStore::purge_expired) removes them.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Source, ValidationResult};

/// Abstract storage backend for sessions, sources, and results.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`put_sources`](ResultStore::put_sources) | Upsert parsed sources for a session |
/// | [`put_results`](ResultStore::put_results) | Upsert validation results for a session |
/// | [`put_batch`](ResultStore::put_batch) | Upsert sources and results in one atomic write |
/// | [`get_sources`](ResultStore::get_sources) | Live sources of a session |
/// | [`get_results`](ResultStore::get_results) | Live results of a session |
/// | [`purge_expired`](ResultStore::purge_expired) | Delete records past their expiry |
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert or replace sources, keyed by `(session_id, source.id)`.
    async fn put_sources(&self, session_id: &str, sources: &[Source], expires_at: i64)
        -> Result<()>;

    /// Insert or replace results, keyed by `(session_id, result.source_id)`.
    async fn put_results(
        &self,
        session_id: &str,
        results: &[ValidationResult],
        expires_at: i64,
    ) -> Result<()>;

    /// Insert or replace sources and results together.
    ///
    /// Either every record is written or none is.
    async fn put_batch(
        &self,
        session_id: &str,
        sources: &[Source],
        results: &[ValidationResult],
        expires_at: i64,
    ) -> Result<()>;

    /// Sources of a session that have not expired at `now`.
    async fn get_sources(&self, session_id: &str, now: i64) -> Result<Vec<Source>>;

    /// Results of a session that have not expired at `now`.
    async fn get_results(&self, session_id: &str, now: i64) -> Result<Vec<ValidationResult>>;

    /// Deletes every record whose expiry is at or before `now`.
    ///
    /// Returns the number of records removed.
    async fn purge_expired(&self, now: i64) -> Result<u64>;
}
