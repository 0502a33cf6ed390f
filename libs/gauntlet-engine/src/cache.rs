/// Cache Layer
///
/// **Core Responsibility:**
/// Content-addressed memoization of sandbox work, in two independent tiers:
/// - single tier: `ExecutionOutcome` of one-case runs (shorter TTL)
/// - batch tier: whole `BatchResult` values (longer TTL)
///
/// **Properties:**
/// - Keys are SHA-256 digests of (code, language, canonical test cases)
/// - Expired entries are removed when looked up and swept on every insert
/// - Process memory only; nothing survives a restart
/// - A poisoned lock is treated as a miss, never as a failure
use gauntlet_common::{BatchResult, ExecutionOutcome, Language, TestCase};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(code: &str, language: Language, test_cases: &[TestCase]) -> Self {
        let canonical = json!({
            "code": code,
            "language": language,
            "test_cases": test_cases,
        });

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        CacheKey(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage seam for one cache tier
pub trait CacheStore<V>: Send + Sync {
    /// Fresh value for `key`, if any. Expired entries are removed.
    fn get(&self, key: &CacheKey) -> Option<V>;

    /// Insert or replace the entry at `key`
    fn put(&self, key: CacheKey, value: V, ttl: Duration);

    /// Remove every expired entry, returning how many were dropped
    fn purge_expired(&self) -> usize;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

/// Mutex-guarded map; every critical section touches a single key or one sweep
pub struct InMemoryCache<V> {
    entries: Mutex<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V> InMemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> Default for InMemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheStore<V> for InMemoryCache<V> {
    fn get(&self, key: &CacheKey) -> Option<V> {
        let Ok(mut entries) = self.entries.lock() else {
            warn!("Cache lock poisoned, treating lookup as a miss");
            return None;
        };

        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: CacheKey, value: V, ttl: Duration) {
        let Ok(mut entries) = self.entries.lock() else {
            warn!("Cache lock poisoned, skipping insert");
            return;
        };

        let now = Instant::now();
        entries.retain(|_, entry| entry.is_fresh(now));
        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                ttl,
            },
        );
    }

    fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };

        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    Single,
    Batch,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTier::Single => write!(f, "single"),
            CacheTier::Batch => write!(f, "batch"),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub single: TierStats,
    pub batch: TierStats,
}

/// Both tiers plus their TTLs, shared by every execution in the process
pub struct ExecutionCache {
    single: Arc<dyn CacheStore<ExecutionOutcome>>,
    batch: Arc<dyn CacheStore<BatchResult>>,
    single_ttl: Duration,
    batch_ttl: Duration,
    single_counters: Counters,
    batch_counters: Counters,
}

impl ExecutionCache {
    pub fn new(
        single: Arc<dyn CacheStore<ExecutionOutcome>>,
        batch: Arc<dyn CacheStore<BatchResult>>,
        single_ttl: Duration,
        batch_ttl: Duration,
    ) -> Self {
        Self {
            single,
            batch,
            single_ttl,
            batch_ttl,
            single_counters: Counters::default(),
            batch_counters: Counters::default(),
        }
    }

    pub fn in_memory(single_ttl: Duration, batch_ttl: Duration) -> Self {
        Self::new(
            Arc::new(InMemoryCache::new()),
            Arc::new(InMemoryCache::new()),
            single_ttl,
            batch_ttl,
        )
    }

    pub fn get_outcome(&self, key: &CacheKey) -> Option<ExecutionOutcome> {
        let found = self.single.get(key);
        self.single_counters.record(found.is_some());
        if found.is_some() {
            debug!(tier = %CacheTier::Single, key = %key, "Cache hit");
        }
        found
    }

    pub fn put_outcome(&self, key: CacheKey, outcome: ExecutionOutcome) {
        self.single.put(key, outcome, self.single_ttl);
    }

    pub fn get_batch(&self, key: &CacheKey) -> Option<BatchResult> {
        let found = self.batch.get(key);
        self.batch_counters.record(found.is_some());
        if found.is_some() {
            debug!(tier = %CacheTier::Batch, key = %key, "Cache hit");
        }
        found
    }

    pub fn put_batch(&self, key: CacheKey, result: BatchResult) {
        self.batch.put(key, result, self.batch_ttl);
    }

    /// Drop every entry in both tiers
    pub fn clear(&self) {
        self.single.clear();
        self.batch.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let tier = |counters: &Counters, entries: usize| TierStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            entries,
        };

        CacheStats {
            single: tier(&self.single_counters, self.single.len()),
            batch: tier(&self.batch_counters, self.batch.len()),
        }
    }
}
