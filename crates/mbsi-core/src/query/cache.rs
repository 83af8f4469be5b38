// ── Query cache engine ──
//
// Keyed, time-bounded store of fetched portal data. `DashMap` for O(1)
// concurrent entry access, per-entry `watch` channels for push-based
// observer notification. Entry state is only ever touched while holding
// the entry's map guard, and the guard is never held across an await --
// the in-flight and rollback invariants need no further locking.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace};

use super::entry::{
    CacheDefaults, Fetcher, QueryEntry, QueryOptions, QuerySnapshot, QueryStatus,
};
use super::key::QueryKey;

struct CacheShared {
    entries: DashMap<QueryKey, QueryEntry>,
    defaults: CacheDefaults,
}

/// The process-wide query cache.
///
/// Cheap to clone; all clones share the same store. Consumers go through
/// this contract only -- nothing outside this module mutates entries.
#[derive(Clone)]
pub struct QueryCache {
    shared: Arc<CacheShared>,
}

/// What a read decided to do while it held the entry guard.
enum Plan {
    Return(QuerySnapshot),
    Wait(watch::Receiver<QuerySnapshot>),
    Start {
        generation: u64,
        fetcher: Fetcher,
        retry_limit: u32,
    },
}

impl QueryCache {
    pub fn new(defaults: CacheDefaults) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                entries: DashMap::new(),
                defaults,
            }),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Read through the cache.
    ///
    /// Fresh data is returned as-is. Missing, stale, or invalidated data
    /// triggers a fetch; while a fetch for this key is already in flight,
    /// the call attaches to it instead of issuing a duplicate request.
    /// With `opts.enabled == false` no fetch is attempted and the status
    /// stays `Idle`.
    pub async fn read(
        &self,
        key: &QueryKey,
        opts: QueryOptions,
        fetcher: Fetcher,
    ) -> QuerySnapshot {
        self.sweep();
        {
            let mut entry = self
                .shared
                .entries
                .entry(key.clone())
                .or_insert_with(|| QueryEntry::new(&self.shared.defaults));
            entry.last_observed = Instant::now();
            entry.apply_options(&opts);
            entry.fetcher = Some(fetcher);
        }

        if !opts.enabled {
            trace!(key = %key, "read disabled, staying idle");
            return self.snapshot(key);
        }

        self.ensure_fetched(key, false).await
    }

    /// Force a refetch (or attach to the in-flight one) for a key that
    /// already has a registered fetcher.
    pub async fn refetch(&self, key: &QueryKey) -> QuerySnapshot {
        self.ensure_fetched(key, true).await
    }

    /// Synchronous, non-triggering read of the cached value.
    pub fn get_data(&self, key: &QueryKey) -> Option<Value> {
        self.shared.entries.get(key).and_then(|e| e.data.clone())
    }

    /// Current snapshot without triggering anything. Unknown keys are `Idle`.
    pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot {
        self.shared
            .entries
            .get(key)
            .map_or_else(QuerySnapshot::idle, |e| e.snapshot())
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Register an observer for a key. While at least one observer is
    /// alive, the entry is exempt from garbage collection and invalidation
    /// triggers an immediate refetch.
    pub fn observe(&self, key: &QueryKey) -> QueryObserver {
        let rx = {
            let mut entry = self
                .shared
                .entries
                .entry(key.clone())
                .or_insert_with(|| QueryEntry::new(&self.shared.defaults));
            entry.observers += 1;
            entry.last_observed = Instant::now();
            entry.watch.subscribe()
        };
        QueryObserver {
            cache: self.clone(),
            key: key.clone(),
            rx,
        }
    }

    // ── Writes (no network) ──────────────────────────────────────────

    /// Synchronous cache write, bypassing the network. Seeds the entry if
    /// it does not exist yet.
    pub fn set_data(&self, key: &QueryKey, value: Value) {
        self.update_data(key, |_| Some(value));
    }

    /// Apply an updater to the cached value. Returning `None` leaves the
    /// entry unchanged (mirrors an updater declining to produce a value).
    pub fn update_data(
        &self,
        key: &QueryKey,
        updater: impl FnOnce(Option<Value>) -> Option<Value>,
    ) {
        let mut entry = self
            .shared
            .entries
            .entry(key.clone())
            .or_insert_with(|| QueryEntry::new(&self.shared.defaults));
        let Some(next) = updater(entry.data.clone()) else {
            return;
        };
        entry.data = Some(next);
        entry.status = QueryStatus::Success;
        entry.error = None;
        entry.fetched_at = Some(Instant::now());
        entry.invalidated = false;
        entry.notify();
    }

    /// Restore a previously captured value verbatim, including "absent".
    /// This is the optimistic-mutation rollback path.
    pub fn restore_data(&self, key: &QueryKey, previous: Option<Value>) {
        let mut entry = self
            .shared
            .entries
            .entry(key.clone())
            .or_insert_with(|| QueryEntry::new(&self.shared.defaults));
        match previous {
            Some(value) => {
                entry.data = Some(value);
                entry.status = QueryStatus::Success;
            }
            None => {
                entry.data = None;
                entry.status = QueryStatus::Idle;
                entry.fetched_at = None;
            }
        }
        entry.error = None;
        entry.notify();
    }

    // ── Invalidation / cancellation / eviction ───────────────────────

    /// Mark every entry matching the prefix as stale. Observed entries
    /// refetch immediately (spawned); the rest refetch on next read.
    /// Returns the matched keys. Idempotent: re-invalidating an already
    /// stale entry changes nothing.
    pub fn invalidate(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        let mut matched = Vec::new();
        let mut to_refetch = Vec::new();
        for mut entry in self.shared.entries.iter_mut() {
            if !entry.key().starts_with(prefix) {
                continue;
            }
            entry.invalidated = true;
            if entry.observers > 0 && !entry.in_flight && entry.fetcher.is_some() {
                to_refetch.push(entry.key().clone());
            }
            matched.push(entry.key().clone());
        }
        debug!(prefix = %prefix, matched = matched.len(), "invalidated");

        for key in to_refetch {
            let cache = self.clone();
            tokio::spawn(async move {
                cache.refetch(&key).await;
            });
        }
        matched
    }

    /// Invalidate a prefix and wait for the refetch of every observed
    /// entry to settle. The mutation layer resolves only after these
    /// refetches complete (documented choice; the alternative of firing
    /// them without blocking is what plain `invalidate` does).
    pub async fn invalidate_and_refetch(&self, prefix: &QueryKey) {
        let mut to_refetch = Vec::new();
        for mut entry in self.shared.entries.iter_mut() {
            if !entry.key().starts_with(prefix) {
                continue;
            }
            entry.invalidated = true;
            if entry.observers > 0 && entry.fetcher.is_some() {
                to_refetch.push(entry.key().clone());
            }
        }
        join_all(to_refetch.iter().map(|key| self.refetch(key))).await;
    }

    /// Discard the eventual result of any in-flight fetch for matching
    /// keys. The underlying network call is not aborted; its completion is
    /// tagged with a superseded generation and dropped on arrival.
    pub fn cancel(&self, prefix: &QueryKey) {
        for mut entry in self.shared.entries.iter_mut() {
            if !entry.key().starts_with(prefix) {
                continue;
            }
            entry.generation += 1;
            if entry.in_flight {
                entry.in_flight = false;
                entry.status = if entry.data.is_some() {
                    QueryStatus::Success
                } else {
                    QueryStatus::Idle
                };
                entry.notify();
            }
        }
    }

    /// Evict matching entries immediately, regardless of observer count.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let before = self.shared.entries.len();
        self.shared.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.shared.entries.len()
    }

    /// Evict the entire cache (logout path).
    pub fn clear(&self) {
        self.shared.entries.clear();
    }

    /// Evict entries with zero observers whose last-observed time exceeds
    /// their `gc_time`. Runs opportunistically on every read and is public
    /// for explicit sweeps.
    pub fn sweep(&self) -> usize {
        let before = self.shared.entries.len();
        self.shared.entries.retain(|_, entry| {
            entry.observers > 0
                || entry.in_flight
                || entry.last_observed.elapsed() <= entry.gc_time
        });
        let evicted = before - self.shared.entries.len();
        if evicted > 0 {
            debug!(evicted, "gc sweep");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }

    // ── Fetch machinery ──────────────────────────────────────────────

    async fn ensure_fetched(&self, key: &QueryKey, force: bool) -> QuerySnapshot {
        let plan = {
            let Some(mut entry) = self.shared.entries.get_mut(key) else {
                return QuerySnapshot::idle();
            };
            if entry.in_flight {
                Plan::Wait(entry.watch.subscribe())
            } else if !force && entry.is_fresh() {
                Plan::Return(entry.snapshot())
            } else if let Some(fetcher) = entry.fetcher.clone() {
                entry.in_flight = true;
                entry.status = QueryStatus::Fetching;
                entry.notify();
                Plan::Start {
                    generation: entry.generation,
                    fetcher,
                    retry_limit: entry.retry_limit,
                }
            } else {
                // Nothing registered to fetch with -- hand back what we have.
                Plan::Return(entry.snapshot())
            }
        };

        match plan {
            Plan::Return(snapshot) => snapshot,
            Plan::Wait(mut rx) => {
                // Attach to the in-flight fetch: exactly one network call
                // per key; everyone else waits for it to settle.
                loop {
                    if rx.borrow_and_update().status != QueryStatus::Fetching {
                        return rx.borrow().clone();
                    }
                    if rx.changed().await.is_err() {
                        return self.snapshot(key);
                    }
                }
            }
            Plan::Start {
                generation,
                fetcher,
                retry_limit,
            } => self.run_fetch(key, generation, fetcher, retry_limit).await,
        }
    }

    async fn run_fetch(
        &self,
        key: &QueryKey,
        generation: u64,
        fetcher: Fetcher,
        retry_limit: u32,
    ) -> QuerySnapshot {
        let mut attempt: u32 = 0;
        loop {
            let result = fetcher().await;

            let Some(mut entry) = self.shared.entries.get_mut(key) else {
                return QuerySnapshot::idle();
            };
            if entry.generation != generation {
                // Superseded by cancel (e.g. an optimistic update) -- this
                // completion must not overwrite the newer value.
                debug!(key = %key, "discarding superseded fetch result");
                return entry.snapshot();
            }

            match result {
                Ok(value) => {
                    entry.data = Some(value);
                    entry.status = QueryStatus::Success;
                    entry.error = None;
                    entry.fetched_at = Some(Instant::now());
                    entry.invalidated = false;
                    entry.in_flight = false;
                    entry.notify();
                    return entry.snapshot();
                }
                Err(err) if attempt < retry_limit => {
                    attempt += 1;
                    debug!(key = %key, attempt, "fetch failed, retrying: {err}");
                    drop(entry);
                }
                Err(err) => {
                    // Exhausted: surface the error but keep the last known
                    // good data (stale-while-error).
                    entry.status = QueryStatus::Error;
                    entry.error = Some(err.to_string());
                    entry.in_flight = false;
                    entry.notify();
                    return entry.snapshot();
                }
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheDefaults::default())
    }
}

/// Subscription handle for one query key.
///
/// Dropping the observer decrements the key's observer count and stamps
/// the last-observed time that drives garbage collection.
pub struct QueryObserver {
    cache: QueryCache,
    key: QueryKey,
    rx: watch::Receiver<QuerySnapshot>,
}

impl QueryObserver {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// The latest snapshot pushed for this key.
    pub fn snapshot(&self) -> QuerySnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change. Returns `None` if the entry was
    /// evicted.
    pub async fn changed(&mut self) -> Option<QuerySnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl Drop for QueryObserver {
    fn drop(&mut self) {
        if let Some(mut entry) = self.cache.shared.entries.get_mut(&self.key) {
            entry.observers = entry.observers.saturating_sub(1);
            entry.last_observed = Instant::now();
        }
    }
}
