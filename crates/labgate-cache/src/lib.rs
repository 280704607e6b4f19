//! # Labgate Cache - Decision Cache
//!
//! Remembers permission decisions for a bounded time so repeated checks skip
//! the store round-trips. Entries are keyed per principal and can be dropped
//! per principal or wholesale when the active identity changes.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use labgate_const::DEFAULT_DECISION_TTL_SECS;
use labgate_types::{PermissionContext, PermissionResult};
use moka::{
    future::Cache,
    notification::{ListenerFuture, RemovalCause},
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Cache key for a single permission decision
///
/// The principal id is part of the key, so a decision computed for one
/// principal can never be served to another. The context is held as-is, so
/// two keys are equal only when their contexts are.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionKey {
    pub principal_id: String,
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub context: Option<PermissionContext>,
}

impl DecisionKey {
    pub fn new(
        principal_id: String,
        resource: String,
        action: String,
        context: Option<&PermissionContext>,
    ) -> Self {
        Self { principal_id, resource, action, context: context.cloned() }
    }
}

/// A cached decision together with its freshness window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: PermissionResult,
    pub computed_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(result: PermissionResult, ttl: Duration) -> Self {
        Self { result, computed_at: Utc::now(), ttl }
    }

    /// An entry is expired once strictly more than `ttl` has elapsed
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(self.computed_at).to_std() {
            Ok(age) => age > self.ttl,
            // computed_at in the future (clock skew on restore): treat as fresh
            Err(_) => false,
        }
    }
}

/// Serialized form of the cache contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<(DecisionKey, CacheEntry)>,
}

/// Outcome of restoring a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub skipped_expired: usize,
    pub skipped_corrupt: usize,
}

/// Stored value: the entry plus the insert sequence number it was indexed under
#[derive(Debug, Clone)]
struct Slot {
    entry: CacheEntry,
    seq: u64,
}

/// principal id -> (key -> sequence number of the live insert)
type PrincipalIndex = HashMap<String, HashMap<DecisionKey, u64>>;

/// Process-local decision cache
///
/// Safe to share across tasks behind an `Arc`. Concurrent misses on the same
/// key are not deduplicated: both callers compute and the last write wins.
///
/// The principal index is never held across an await on the underlying
/// cache, since capacity evictions take it from the eviction listener.
pub struct DecisionCache {
    entries: Cache<DecisionKey, Slot>,
    principal_index: Arc<RwLock<PrincipalIndex>>,
    default_ttl: Duration,
    sequence: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl DecisionCache {
    /// Create an unbounded cache
    pub fn new(default_ttl: Duration) -> Self {
        Self::build(None, default_ttl)
    }

    /// Create a cache that evicts once `max_capacity` entries are held
    pub fn with_capacity(max_capacity: u64, default_ttl: Duration) -> Self {
        Self::build(Some(max_capacity), default_ttl)
    }

    fn build(max_capacity: Option<u64>, default_ttl: Duration) -> Self {
        let principal_index = Arc::new(RwLock::new(PrincipalIndex::new()));

        let listener_index = Arc::clone(&principal_index);
        let mut builder = Cache::builder().async_eviction_listener(
            move |key: Arc<DecisionKey>, slot: Slot, cause: RemovalCause| -> ListenerFuture {
                let index = Arc::clone(&listener_index);
                Box::pin(async move {
                    // Explicit removals unindex themselves; replacements stay indexed
                    if cause == RemovalCause::Size {
                        unindex(&index, &key, slot.seq).await;
                    }
                })
            },
        );
        if let Some(capacity) = max_capacity {
            builder = builder.max_capacity(capacity);
        }

        Self {
            entries: builder.build(),
            principal_index,
            default_ttl,
            sequence: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a cached decision, dropping it if it has outlived its TTL
    pub async fn get(&self, key: &DecisionKey) -> Option<PermissionResult> {
        match self.entries.get(key).await {
            Some(slot) if !slot.entry.is_expired_at(Utc::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(slot.entry.result)
            },
            Some(slot) => {
                debug!(
                    principal = %key.principal_id,
                    resource = %key.resource,
                    action = %key.action,
                    "Cached decision expired"
                );
                self.remove(key, slot.seq).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Cache a decision for `ttl`
    pub async fn put(&self, key: DecisionKey, result: PermissionResult, ttl: Duration) {
        self.insert_entry(key, CacheEntry::new(result, ttl)).await;
    }

    async fn insert_entry(&self, key: DecisionKey, entry: CacheEntry) {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(key.clone(), Slot { entry, seq }).await;

        // Indexed only once live: an invalidation racing this insert may miss
        // the entry, but every later one finds it. An entry already evicted
        // for capacity is left out.
        let mut index = self.principal_index.write().await;
        if !self.entries.contains_key(&key) {
            return;
        }
        let indexed = index.entry(key.principal_id.clone()).or_default().entry(key).or_insert(seq);
        *indexed = (*indexed).max(seq);
    }

    async fn remove(&self, key: &DecisionKey, seq: u64) {
        self.entries.invalidate(key).await;
        unindex(&self.principal_index, key, seq).await;
    }

    /// Drop every cached decision for one principal
    ///
    /// Use this on role changes and grant revocations; TTL decay alone is
    /// too slow for revocation.
    pub async fn invalidate(&self, principal_id: &str) {
        let keys = self.principal_index.write().await.remove(principal_id);
        if let Some(keys) = keys {
            for key in keys.into_keys() {
                self.entries.invalidate(&key).await;
            }
        }

        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop every cached decision
    pub async fn invalidate_all(&self) {
        let mut index = self.principal_index.write().await;
        self.entries.invalidate_all();
        index.clear();
        drop(index);

        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Export all live entries
    pub async fn snapshot(&self) -> CacheSnapshot {
        self.entries.run_pending_tasks().await;

        let now = Utc::now();
        let entries = self
            .entries
            .iter()
            .filter(|(_, slot)| !slot.entry.is_expired_at(now))
            .map(|(key, slot)| ((*key).clone(), slot.entry))
            .collect();

        CacheSnapshot { entries }
    }

    /// Load entries from a serialized snapshot
    ///
    /// Unreadable entries are skipped rather than reported as errors: a
    /// corrupt entry is just a future cache miss.
    pub async fn restore(&self, value: &serde_json::Value) -> RestoreReport {
        let mut report = RestoreReport::default();

        let Some(items) = value.get("entries").and_then(serde_json::Value::as_array) else {
            warn!("Cache snapshot has no entries array, ignoring");
            return report;
        };

        let now = Utc::now();
        for item in items {
            match serde_json::from_value::<(DecisionKey, CacheEntry)>(item.clone()) {
                Ok((_, entry)) if entry.is_expired_at(now) => report.skipped_expired += 1,
                Ok((key, entry)) => {
                    self.insert_entry(key, entry).await;
                    report.restored += 1;
                },
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable cache snapshot entry");
                    report.skipped_corrupt += 1;
                },
            }
        }

        debug!(
            restored = report.restored,
            skipped_expired = report.skipped_expired,
            skipped_corrupt = report.skipped_corrupt,
            "Cache snapshot restored"
        );

        report
    }

    /// Flush moka's deferred maintenance so `stats().entry_count` is exact
    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        let total_requests = hits + misses;
        let hit_rate =
            if total_requests > 0 { (hits as f64 / total_requests as f64) * 100.0 } else { 0.0 };

        CacheStats {
            entry_count: self.entries.entry_count(),
            hits,
            misses,
            hit_rate,
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    /// Reset statistics
    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.invalidations.store(0, Ordering::Relaxed);
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_DECISION_TTL_SECS))
    }
}

/// Drop `key` from the index if it is still indexed under `seq`
///
/// A newer insert of the same key carries a newer sequence number and is left
/// alone.
async fn unindex(index: &RwLock<PrincipalIndex>, key: &DecisionKey, seq: u64) {
    let mut index = index.write().await;
    if let Some(keys) = index.get_mut(&key.principal_id) {
        if keys.get(key) == Some(&seq) {
            keys.remove(key);
        }
        if keys.is_empty() {
            index.remove(&key.principal_id);
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entry_count: u64,
    pub hits: u64,
    pub misses: u64,
    /// Percentage of lookups served from the cache (0.0 - 100.0)
    pub hit_rate: f64,
    pub invalidations: u64,
}
