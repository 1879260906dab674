//! Thread-safe, size- and time-bounded store of prompt plans.
//!
//! Entries expire on a sliding TTL: every hit pushes the expiry forward, a
//! gap longer than the TTL since the last hit expires the entry. Expired
//! entries are swept lazily on mutation and on the read that notices them.
//! Capacity pressure evicts oldest-inserted entries first. A secondary index
//! by library fingerprint supports bulk invalidation on library change.

use crate::clock::Clock;
use crate::metrics;
use crate::planner::{PlanError, PromptPlan};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

struct CacheEntry {
    plan: PromptPlan,
    library_fingerprint: String,
    ttl: Duration,
    // Slides forward on every hit; guarded separately so reads only need
    // the outer read lock.
    expires_at: Mutex<DateTime<Utc>>,
    seq: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Arc<CacheEntry>>,
    by_fingerprint: HashMap<String, BTreeSet<String>>,
}

impl CacheInner {
    fn insert(&mut self, key: String, entry: Arc<CacheEntry>) {
        self.remove(&key);
        self.by_fingerprint
            .entry(entry.library_fingerprint.clone())
            .or_default()
            .insert(key.clone());
        self.entries.insert(key, entry);
    }

    fn remove(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        if let Some(keys) = self.by_fingerprint.get_mut(&entry.library_fingerprint) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_fingerprint.remove(&entry.library_fingerprint);
            }
        }
        true
    }

    /// Remove every expired entry; returns how many went away.
    fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| *e.expires_at.lock().unwrap() <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            self.remove(key);
        }
        stale.len()
    }

    /// Evict oldest-inserted entries until `capacity` holds; returns count.
    fn evict_to_capacity(&mut self, capacity: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    self.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

/// Bounded plan store keyed by opaque cache key.
pub struct PlanCache {
    inner: RwLock<CacheInner>,
    capacity: AtomicUsize,
    seq: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl PlanCache {
    /// Create a cache holding at most `capacity` plans. Zero capacity is a
    /// contract violation, rejected eagerly.
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Result<Self, PlanError> {
        if capacity == 0 {
            return Err(PlanError::InvalidCapacity(capacity));
        }
        Ok(Self {
            inner: RwLock::new(CacheInner::default()),
            capacity: AtomicUsize::new(capacity),
            seq: AtomicU64::new(0),
            clock,
        })
    }

    /// Insert or overwrite a plan under `key` with the given TTL.
    ///
    /// Already-expired entries are swept first; if the insert pushes the
    /// cache over capacity, oldest-inserted entries are evicted.
    pub fn set(&self, key: &str, plan: &PromptPlan, ttl: Duration) {
        let now = self.clock.utc_now();
        let mut stored = plan.clone();
        stored.from_cache = false;

        let entry = Arc::new(CacheEntry {
            library_fingerprint: stored.library_fingerprint.clone(),
            plan: stored,
            ttl,
            expires_at: Mutex::new(now + ttl),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        });

        let mut inner = self.inner.write().unwrap();
        let swept = inner.sweep_expired(now);
        inner.insert(key.to_string(), entry);
        let evicted = inner.evict_to_capacity(self.capacity.load(Ordering::Relaxed));

        if swept + evicted > 0 {
            metrics::record_cache_evictions(swept + evicted);
        }
        metrics::set_cache_size(inner.entries.len());
    }

    /// Look up a plan, sliding its expiry forward on a hit.
    ///
    /// The returned plan is an owned, independent copy with `from_cache`
    /// set; mutating it never affects later reads of the same key.
    pub fn try_get(&self, key: &str) -> Option<PromptPlan> {
        let now = self.clock.utc_now();
        {
            let inner = self.inner.read().unwrap();
            match inner.entries.get(key) {
                None => {
                    metrics::record_cache_miss();
                    return None;
                }
                Some(entry) => {
                    let mut expires_at = entry.expires_at.lock().unwrap();
                    if *expires_at > now {
                        *expires_at = now + entry.ttl;
                        let mut plan = entry.plan.clone();
                        plan.from_cache = true;
                        metrics::record_cache_hit();
                        return Some(plan);
                    }
                }
            }
        }

        // Entry expired under us: remove it lazily.
        let mut inner = self.inner.write().unwrap();
        let still_expired = inner
            .entries
            .get(key)
            .map(|entry| *entry.expires_at.lock().unwrap() <= self.clock.utc_now())
            .unwrap_or(false);
        if still_expired {
            inner.remove(key);
            metrics::record_cache_evictions(1);
            debug!(key, "Evicted expired plan on read");
        }
        metrics::set_cache_size(inner.entries.len());
        metrics::record_cache_miss();
        None
    }

    /// Remove every entry whose library fingerprint equals `fingerprint`.
    pub fn invalidate_by_fingerprint(&self, fingerprint: &str) -> usize {
        let mut inner = self.inner.write().unwrap();
        let keys: Vec<String> = inner
            .by_fingerprint
            .get(fingerprint)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        for key in &keys {
            inner.remove(key);
        }
        if !keys.is_empty() {
            metrics::record_cache_evictions(keys.len());
            debug!(
                fingerprint,
                count = keys.len(),
                "Invalidated plans by library fingerprint"
            );
        }
        metrics::set_cache_size(inner.entries.len());
        keys.len()
    }

    /// Change the capacity, evicting oldest entries immediately if shrinking
    /// below the current count.
    pub fn configure(&self, new_capacity: usize) -> Result<(), PlanError> {
        if new_capacity == 0 {
            return Err(PlanError::InvalidCapacity(new_capacity));
        }
        self.capacity.store(new_capacity, Ordering::Relaxed);
        let mut inner = self.inner.write().unwrap();
        let evicted = inner.evict_to_capacity(new_capacity);
        if evicted > 0 {
            metrics::record_cache_evictions(evicted);
        }
        metrics::set_cache_size(inner.entries.len());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
