//! FILENAME: pivot-engine/src/cache.rs
//! Result Cache - Explicit memoization of pipeline stages.
//!
//! Entries are keyed by the operation name plus a hash of the serialized
//! arguments, so identical (table, definition) inputs reuse earlier output.
//! Nothing is evicted implicitly; callers invalidate with `clear()` or
//! `invalidate(operation)`. Failed computations are never stored.

use std::hash::Hasher;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHasher};
use serde::Serialize;

use engine::{EngineError, EngineResult, Table};

use crate::aggregate::Aggregation;

/// Identifies one memoized computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: &'static str,
    pub hash: u64,
}

/// Hashes the JSON serialization of `args`.
pub fn content_hash<T: Serialize + ?Sized>(args: &T) -> EngineResult<u64> {
    let bytes = serde_json::to_vec(args).map_err(|e| EngineError::Cache(e.to_string()))?;
    let mut hasher = FxHasher::default();
    hasher.write(&bytes);
    Ok(hasher.finish())
}

pub fn cache_key<T: Serialize + ?Sized>(operation: &'static str, args: &T) -> EngineResult<CacheKey> {
    Ok(CacheKey {
        operation,
        hash: content_hash(args)?,
    })
}

/// Hit/miss counters since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
pub struct ResultCache {
    tables: FxHashMap<CacheKey, Arc<Table>>,
    aggregations: FxHashMap<CacheKey, Arc<Aggregation>>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table for `key`, computing and storing it on a miss.
    pub fn table_or_insert_with<F>(&mut self, key: CacheKey, compute: F) -> EngineResult<Arc<Table>>
    where
        F: FnOnce() -> EngineResult<Table>,
    {
        if let Some(hit) = self.tables.get(&key) {
            self.hits += 1;
            log::debug!(target: "CACHE", "hit {} {:016x}", key.operation, key.hash);
            return Ok(Arc::clone(hit));
        }
        self.misses += 1;
        log::debug!(target: "CACHE", "miss {} {:016x}", key.operation, key.hash);

        let table = Arc::new(compute()?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Looks up a cached aggregation, counting a hit when present.
    pub fn aggregation(&mut self, key: &CacheKey) -> Option<Arc<Aggregation>> {
        let hit = self.aggregations.get(key).map(Arc::clone)?;
        self.hits += 1;
        log::debug!(target: "CACHE", "hit {} {:016x}", key.operation, key.hash);
        Some(hit)
    }

    /// Same as `table_or_insert_with` for aggregation results.
    pub fn aggregation_or_insert_with<F>(
        &mut self,
        key: CacheKey,
        compute: F,
    ) -> EngineResult<Arc<Aggregation>>
    where
        F: FnOnce() -> EngineResult<Aggregation>,
    {
        if let Some(hit) = self.aggregations.get(&key) {
            self.hits += 1;
            log::debug!(target: "CACHE", "hit {} {:016x}", key.operation, key.hash);
            return Ok(Arc::clone(hit));
        }
        self.misses += 1;
        log::debug!(target: "CACHE", "miss {} {:016x}", key.operation, key.hash);

        let result = Arc::new(compute()?);
        self.aggregations.insert(key, Arc::clone(&result));
        Ok(result)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.tables.contains_key(key) || self.aggregations.contains_key(key)
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&mut self) {
        let dropped = self.len();
        self.tables.clear();
        self.aggregations.clear();
        log::info!(target: "CACHE", "cleared {} entries", dropped);
    }

    /// Drops every entry produced by `operation`.
    pub fn invalidate(&mut self, operation: &str) -> usize {
        let before = self.len();
        self.tables.retain(|key, _| key.operation != operation);
        self.aggregations.retain(|key, _| key.operation != operation);
        let dropped = before - self.len();
        log::info!(target: "CACHE", "invalidated {} '{}' entries", dropped, operation);
        dropped
    }

    pub fn len(&self) -> usize {
        self.tables.len() + self.aggregations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.len(),
        }
    }
}
