// ── Mutation layer ──
//
// Write operations against the portal, wired to the query cache. A plain
// `Mutation` runs the mutator then invalidates the affected keys. An
// `OptimisticMutation` additionally patches the cache before the network
// round-trip and rolls the patch back verbatim if the mutator fails.

use serde_json::Value;
use tracing::debug;

use super::cache::QueryCache;
use super::key::QueryKey;
use crate::error::CoreError;

/// A write operation that settles by invalidating query-key prefixes.
///
/// Invalidation happens whether the mutator succeeded or failed, and the
/// returned future resolves only after the refetch of every observed
/// matching entry has settled.
pub struct Mutation {
    cache: QueryCache,
    invalidates: Vec<QueryKey>,
}

impl Mutation {
    pub fn new(cache: QueryCache) -> Self {
        Self {
            cache,
            invalidates: Vec::new(),
        }
    }

    /// Add a key prefix to invalidate when the mutation settles.
    #[must_use]
    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    /// Run the mutator, then settle.
    pub async fn run<T, F>(&self, mutator: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        let result = mutator.await;
        self.settle().await;
        result
    }

    async fn settle(&self) {
        for prefix in &self.invalidates {
            self.cache.invalidate_and_refetch(prefix).await;
        }
    }
}

/// A mutation that applies its expected outcome to the cache up front.
///
/// Lifecycle: cancel in-flight fetches for the target key (so a late
/// completion cannot clobber the patch), snapshot the current value,
/// apply the optimistic update, run the mutator. On failure the snapshot
/// is restored verbatim, including the "no cached value" case. Either
/// way the target key and the invalidation prefixes are refetched on
/// settle, reconciling the cache with the server.
pub struct OptimisticMutation {
    cache: QueryCache,
    target: QueryKey,
    invalidates: Vec<QueryKey>,
}

impl OptimisticMutation {
    pub fn new(cache: QueryCache, target: QueryKey) -> Self {
        Self {
            cache,
            target,
            invalidates: Vec::new(),
        }
    }

    #[must_use]
    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    /// Apply `update` to the target key's cached value, then run the
    /// mutator. The updater receives the current value (if any) and
    /// returns the optimistic replacement, or `None` to leave the cache
    /// untouched.
    pub async fn run<T, F, U>(&self, update: U, mutator: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
        U: FnOnce(Option<Value>) -> Option<Value>,
    {
        self.cache.cancel(&self.target);
        let previous = self.cache.get_data(&self.target);
        self.cache.update_data(&self.target, update);

        let result = mutator.await;
        if let Err(err) = &result {
            debug!(key = %self.target, "mutation failed, rolling back: {err}");
            self.cache.restore_data(&self.target, previous);
        }

        // The target always reconciles with the server, even when no
        // caller-supplied prefix covers it.
        self.cache.invalidate_and_refetch(&self.target).await;
        for prefix in &self.invalidates {
            self.cache.invalidate_and_refetch(prefix).await;
        }
        result
    }
}
