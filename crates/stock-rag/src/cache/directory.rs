//! Directory cache with serialized refresh
//!
//! The stock list is the one piece of state written by both the periodic
//! refresh task and on-demand callers. All writes go through a single mutex
//! held across the upstream call, so at most one refresh runs at a time.
//! Readers never take that lock: they hold a `watch` receiver and see the
//! latest published [`StockMap`].

use super::{CacheEntry, CacheEvent, CacheStats, CacheStatsSnapshot, Fetch, ttl_delta};
use crate::api::DirectorySource;
use crate::clock::Clock;
use crate::directory::{StockDirectory, StockMap, StockRecord};
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const CACHE_NAME: &str = "directory";

/// Read-through cache over the upstream stock list
pub struct DirectoryCache {
    source: Arc<dyn DirectorySource>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    entry: Mutex<Option<CacheEntry<Arc<[StockRecord]>>>>,
    snapshot: watch::Sender<Arc<StockMap>>,
    stats: CacheStats,
}

impl DirectoryCache {
    pub fn new(source: Arc<dyn DirectorySource>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(StockMap::default()));
        Self {
            source,
            ttl: ttl_delta(ttl),
            clock,
            entry: Mutex::new(None),
            snapshot,
            stats: CacheStats::default(),
        }
    }

    /// New receiver on the published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<StockMap>> {
        self.snapshot.subscribe()
    }

    /// Resolver that follows this cache's refreshes
    pub fn directory(&self) -> StockDirectory {
        StockDirectory::new(self.subscribe())
    }

    /// Stock records, fetched from upstream when missing or stale.
    ///
    /// A successful fetch replaces the stored records and publishes a new
    /// map. A failed or empty fetch leaves both untouched; the stale entry
    /// stays in place so the next call retries.
    pub async fn records(&self) -> Fetch<Arc<[StockRecord]>> {
        let mut entry = self.entry.lock().await;

        if let Some(current) = entry.as_ref().filter(|e| e.is_fresh(self.clock.now())) {
            self.stats.record(CACHE_NAME, CacheEvent::Hit);
            return Fetch::Found(Arc::clone(&current.value));
        }
        self.stats.record(CACHE_NAME, CacheEvent::Miss);

        match self.source.stock_records().await {
            Ok(records) if records.is_empty() => {
                warn!("directory source returned no records, keeping previous snapshot");
                Fetch::Empty
            }
            Ok(records) => {
                let records: Arc<[StockRecord]> = records.into();
                let map = StockMap::from_records(&records);
                info!(records = records.len(), keys = map.len(), "directory refreshed");

                *entry = Some(CacheEntry::new(
                    Arc::clone(&records),
                    self.clock.now(),
                    self.ttl,
                ));
                self.snapshot.send_replace(Arc::new(map));
                self.stats.record(CACHE_NAME, CacheEvent::Refresh);
                Fetch::Found(records)
            }
            Err(e) => {
                warn!(error = %e, "directory refresh failed, keeping previous snapshot");
                Fetch::Failed(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Refresh the directory now and then every `interval`, forever.
///
/// Abort the returned handle to stop the task.
pub fn spawn_directory_refresh(cache: Arc<DirectoryCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match cache.records().await {
                Fetch::Found(records) => {
                    info!(records = records.len(), "directory refresh pass done");
                }
                Fetch::Empty => warn!("directory refresh pass found nothing"),
                Fetch::Failed(_) => {}
            }
            tokio::time::sleep(interval).await;
        }
    })
}
