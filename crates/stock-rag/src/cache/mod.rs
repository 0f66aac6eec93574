//! Caching layer for upstream data to reduce API calls
//!
//! Every data kind gets its own [`TtlCache`] with an independent lifespan.
//! Entries are valid while `now < expires_at`; an entry whose expiry equals
//! the current instant is already stale.
//!
//! Only the directory cache serializes its refreshes (see
//! [`DirectoryCache`]). The other caches hold their lock just long enough to
//! read or write one entry, so two callers missing the same key at the same
//! time will both hit the upstream. That duplicate call is accepted.

mod directory;
mod layer;

pub use directory::{DirectoryCache, spawn_directory_refresh};
pub use layer::{CacheLayer, CacheLayerStats};

use crate::clock::Clock;
use crate::error::StockError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Outcome of a read-through lookup
///
/// Lets callers tell "the upstream had nothing" apart from "the upstream
/// could not be reached".
#[derive(Debug)]
pub enum Fetch<T> {
    /// Value served from cache or freshly fetched
    Found(T),
    /// Upstream answered but had no usable data
    Empty,
    /// Upstream call failed
    Failed(StockError),
}

impl<T> Fetch<T> {
    /// Collapse to an `Option`, treating failures as absence
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Empty | Self::Failed(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// A cached value with its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, now: DateTime<Utc>, ttl: TimeDelta) -> Self {
        Self {
            value,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// `true` strictly before the expiry instant
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Cache diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Hit,
    Miss,
    Refresh,
}

impl CacheEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Refresh => "refresh",
        }
    }
}

/// Hit/miss/refresh counters for one cache
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
}

impl CacheStats {
    pub fn record(&self, cache: &'static str, event: CacheEvent) {
        let counter = match event {
            CacheEvent::Hit => &self.hits,
            CacheEvent::Miss => &self.misses,
            CacheEvent::Refresh => &self.refreshes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cache, event = event.as_str(), "cache event");
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
        }
    }
}

pub(crate) fn ttl_delta(ttl: Duration) -> TimeDelta {
    TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
}

/// Thread-safe key/value cache with a single TTL
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    entries: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    stats: Arc<CacheStats>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create a new cache with specified TTL
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl: ttl_delta(ttl),
            clock,
            entries: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Get a fresh value, recording a hit or a miss
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                self.stats.record(self.name, CacheEvent::Hit);
                Some(entry.value.clone())
            }
            _ => {
                self.stats.record(self.name, CacheEvent::Miss);
                None
            }
        }
    }

    /// Store a value, replacing whatever was there
    pub async fn insert(&self, key: K, value: V) {
        let entry = CacheEntry::new(value, self.clock.now(), self.ttl);
        self.entries.write().await.insert(key, entry);
        self.stats.record(self.name, CacheEvent::Refresh);
    }

    /// Get or fetch a value using the provided fetcher function
    ///
    /// If a fresh value exists it is returned immediately. Otherwise the
    /// fetcher runs and only an `Ok` result is cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Expiry of the stored entry, fresh or not
    pub async fn expires_at(&self, key: &K) -> Option<DateTime<Utc>> {
        self.entries.read().await.get(key).map(|e| e.expires_at)
    }

    /// Get the number of stored entries, including stale ones
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            ttl: self.ttl,
            clock: Arc::clone(&self.clock),
            entries: Arc::clone(&self.entries),
            stats: Arc::clone(&self.stats),
        }
    }
}
