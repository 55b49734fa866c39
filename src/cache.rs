//! Per-symbol report cache with lazy expiry
//!
//! Entries are never swept; an expired entry is dropped by the read that
//! finds it stale.

use crate::report::AnalysisReport;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub report: Arc<AnalysisReport>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ReportCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh report for `symbol` as of `now`
    pub fn get(&self, symbol: &str, now: DateTime<Utc>) -> Option<Arc<AnalysisReport>> {
        {
            let entry = self.entries.get(symbol)?;
            if now < entry.expires_at {
                return Some(Arc::clone(&entry.report));
            }
        }

        // Re-check under the write lock in case a fresh report landed meanwhile
        if self
            .entries
            .remove_if(symbol, |_, entry| now >= entry.expires_at)
            .is_some()
        {
            debug!("Evicted expired report for {}", symbol);
        }
        None
    }

    /// Store `report`, replacing any previous entry for its symbol
    pub fn insert(&self, report: Arc<AnalysisReport>, now: DateTime<Utc>) {
        let symbol = report.symbol.clone();
        self.entries.insert(
            symbol,
            CacheEntry {
                report,
                cached_at: now,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Entries currently held, expired ones included until they are read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
