//! In-memory [`ResultStore`] implementation for testing and embedding.
//!
//! Uses `BTreeMap`s behind `std::sync::RwLock`, so reads come back in
//! `(session_id, source_id)` order.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Source, ValidationResult};

use super::ResultStore;

type Key = (String, String);

struct Stored<T> {
    value: T,
    expires_at: i64,
}

/// In-memory store for tests and single-process use.
pub struct InMemoryStore {
    sources: RwLock<BTreeMap<Key, Stored<Source>>>,
    results: RwLock<BTreeMap<Key, Stored<ValidationResult>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(BTreeMap::new()),
            results: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn insert_sources(
    map: &mut BTreeMap<Key, Stored<Source>>,
    session_id: &str,
    sources: &[Source],
    expires_at: i64,
) {
    for s in sources {
        map.insert(
            (session_id.to_string(), s.id.clone()),
            Stored {
                value: s.clone(),
                expires_at,
            },
        );
    }
}

fn insert_results(
    map: &mut BTreeMap<Key, Stored<ValidationResult>>,
    session_id: &str,
    results: &[ValidationResult],
    expires_at: i64,
) {
    for r in results {
        map.insert(
            (session_id.to_string(), r.source_id.clone()),
            Stored {
                value: r.clone(),
                expires_at,
            },
        );
    }
}

fn live<T: Clone>(map: &BTreeMap<Key, Stored<T>>, session_id: &str, now: i64) -> Vec<T> {
    map.iter()
        .filter(|((sid, _), stored)| sid == session_id && stored.expires_at > now)
        .map(|(_, stored)| stored.value.clone())
        .collect()
}

#[async_trait]
impl ResultStore for InMemoryStore {
    async fn put_sources(
        &self,
        session_id: &str,
        sources: &[Source],
        expires_at: i64,
    ) -> Result<()> {
        let mut map = write(&self.sources)?;
        insert_sources(&mut map, session_id, sources, expires_at);
        Ok(())
    }

    async fn put_results(
        &self,
        session_id: &str,
        results: &[ValidationResult],
        expires_at: i64,
    ) -> Result<()> {
        let mut map = write(&self.results)?;
        insert_results(&mut map, session_id, results, expires_at);
        Ok(())
    }

    async fn put_batch(
        &self,
        session_id: &str,
        sources: &[Source],
        results: &[ValidationResult],
        expires_at: i64,
    ) -> Result<()> {
        let mut source_map = write(&self.sources)?;
        let mut result_map = write(&self.results)?;
        insert_sources(&mut source_map, session_id, sources, expires_at);
        insert_results(&mut result_map, session_id, results, expires_at);
        Ok(())
    }

    async fn get_sources(&self, session_id: &str, now: i64) -> Result<Vec<Source>> {
        Ok(live(&*read(&self.sources)?, session_id, now))
    }

    async fn get_results(&self, session_id: &str, now: i64) -> Result<Vec<ValidationResult>> {
        Ok(live(&*read(&self.results)?, session_id, now))
    }

    async fn purge_expired(&self, now: i64) -> Result<u64> {
        let mut source_map = write(&self.sources)?;
        let mut result_map = write(&self.results)?;
        let before = source_map.len() + result_map.len();
        source_map.retain(|_, stored| stored.expires_at > now);
        result_map.retain(|_, stored| stored.expires_at > now);
        Ok((before - source_map.len() - result_map.len()) as u64)
    }
}
