//! Stock directory: free text to ticker resolution
//!
//! The directory is a snapshot built from the upstream stock list. Each
//! record contributes two keys, its uppercased display name and its code,
//! both pointing at the code. Snapshots are immutable; a refresh publishes
//! a new one through a `watch` channel and the resolver picks it up on its
//! next call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// One listed security
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub display_name: String,
    pub code: String,
}

impl StockRecord {
    pub fn new(display_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            code: code.into(),
        }
    }
}

/// A successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical stock code
    pub ticker: String,
    /// Directory key that matched (uppercased)
    pub label: String,
    /// Display name of the matched record
    pub name: String,
}

/// Name/code lookup table built from one directory snapshot
#[derive(Debug, Default, Clone)]
pub struct StockMap {
    lookup: HashMap<String, String>,
    // Keys in insertion order; drives the substring fallback.
    keys: Vec<String>,
    names: HashMap<String, String>,
}

impl StockMap {
    /// Build the table. Records with a blank name or code are skipped.
    pub fn from_records(records: &[StockRecord]) -> Self {
        let mut map = Self::default();
        for record in records {
            let name = record.display_name.trim();
            let code = record.code.trim();
            if name.is_empty() || code.is_empty() {
                continue;
            }
            map.insert_key(name.to_uppercase(), code);
            map.insert_key(code.to_string(), code);
            map.names
                .entry(code.to_string())
                .or_insert_with(|| name.to_string());
        }
        map
    }

    fn insert_key(&mut self, key: String, code: &str) {
        if self.lookup.insert(key.clone(), code.to_string()).is_none() {
            self.keys.push(key);
        }
    }

    /// Number of distinct keys (two per record, minus collisions)
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Exact lookup of an already-uppercased key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lookup.get(key).map(String::as_str)
    }

    /// Display name for a code
    pub fn display_name(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// Resolve free text to a ticker.
    ///
    /// Exact key match wins. Otherwise the first key (insertion order) of at
    /// least two characters contained in the uppercased text is used.
    pub fn resolve(&self, text: &str) -> Option<Resolution> {
        let query = text.trim().to_uppercase();
        if query.is_empty() {
            return None;
        }

        if let Some(code) = self.lookup.get(&query) {
            return Some(self.resolution(code, query.clone()));
        }

        self.keys
            .iter()
            .map(|key| key.trim())
            .find(|key| key.chars().count() >= 2 && query.contains(key))
            .and_then(|key| {
                self.lookup
                    .get(key)
                    .map(|code| self.resolution(code, key.to_string()))
            })
    }

    fn resolution(&self, code: &str, label: String) -> Resolution {
        Resolution {
            ticker: code.to_string(),
            name: self.display_name(code).unwrap_or(code).to_string(),
            label,
        }
    }
}

/// Resolver reading the latest published snapshot
#[derive(Debug, Clone)]
pub struct StockDirectory {
    snapshot: watch::Receiver<Arc<StockMap>>,
}

impl StockDirectory {
    pub fn new(snapshot: watch::Receiver<Arc<StockMap>>) -> Self {
        Self { snapshot }
    }

    /// Directory over a fixed set of records, never refreshed
    pub fn from_records(records: &[StockRecord]) -> Self {
        let (_tx, rx) = watch::channel(Arc::new(StockMap::from_records(records)));
        Self::new(rx)
    }

    /// Current snapshot
    pub fn current(&self) -> Arc<StockMap> {
        Arc::clone(&self.snapshot.borrow())
    }

    pub fn resolve(&self, text: &str) -> Option<Resolution> {
        let map = self.current();
        match map.resolve(text) {
            Some(found) => {
                tracing::info!(query = text, ticker = %found.ticker, label = %found.label, "resolved company");
                Some(found)
            }
            None => {
                tracing::info!(query = text, known = map.len() / 2, "no matching company");
                None
            }
        }
    }
}
