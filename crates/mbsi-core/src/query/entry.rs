// ── Cache entry state ──
//
// One entry per query key. Entries are owned exclusively by the cache;
// consumers only ever see `QuerySnapshot` copies pushed through the
// entry's watch channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::CoreError;

/// Async function that produces the value for one query key.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, CoreError>> + Send + Sync>;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched (or disabled).
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// Last fetch succeeded.
    Success,
    /// Last fetch exhausted its retries. Previously fetched data is
    /// preserved (stale-while-error).
    Error,
}

/// Point-in-time view of a cache entry, as delivered to observers.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl QuerySnapshot {
    pub(crate) fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_fetching(&self) -> bool {
        self.status == QueryStatus::Fetching
    }
}

/// Cache-wide defaults, overridable per read via [`QueryOptions`].
#[derive(Debug, Clone, Copy)]
pub struct CacheDefaults {
    /// Age after which data triggers a background refetch on access.
    pub stale_time: Duration,
    /// Inactivity (zero observers) after which an entry is evicted.
    pub gc_time: Duration,
    /// Failure retries per fetch. Writes never retry.
    pub retry_limit: u32,
}

impl Default for CacheDefaults {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(15 * 60),
            retry_limit: 1,
        }
    }
}

/// Per-read overrides.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// When `false`, no fetch is attempted and the status stays `Idle`
    /// until a later read enables the query.
    pub enabled: bool,
    pub stale_time: Option<Duration>,
    pub gc_time: Option<Duration>,
    pub retry_limit: Option<u32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: None,
            gc_time: None,
            retry_limit: None,
        }
    }
}

impl QueryOptions {
    /// Options for a gated read (e.g. a parameter is not resolved yet).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn stale_time(mut self, value: Duration) -> Self {
        self.stale_time = Some(value);
        self
    }

    pub fn gc_time(mut self, value: Duration) -> Self {
        self.gc_time = Some(value);
        self
    }

    pub fn retry_limit(mut self, value: u32) -> Self {
        self.retry_limit = Some(value);
        self
    }
}

/// Internal entry record. Never leaves the cache.
pub(crate) struct QueryEntry {
    pub data: Option<Value>,
    pub status: QueryStatus,
    pub error: Option<String>,
    pub fetched_at: Option<Instant>,
    /// Forced staleness from `invalidate`, independent of age.
    pub invalidated: bool,
    pub last_observed: Instant,
    pub stale_time: Duration,
    pub gc_time: Duration,
    pub retry_limit: u32,
    /// Bumped by `cancel`. A fetch completion whose issue-time generation
    /// no longer matches is discarded.
    pub generation: u64,
    /// At most one fetch per key is in flight; concurrent readers attach
    /// to this one through the watch channel.
    pub in_flight: bool,
    pub observers: usize,
    pub fetcher: Option<Fetcher>,
    pub watch: watch::Sender<QuerySnapshot>,
}

impl QueryEntry {
    pub fn new(defaults: &CacheDefaults) -> Self {
        let (watch, _) = watch::channel(QuerySnapshot::idle());
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
            invalidated: false,
            last_observed: Instant::now(),
            stale_time: defaults.stale_time,
            gc_time: defaults.gc_time,
            retry_limit: defaults.retry_limit,
            generation: 0,
            in_flight: false,
            observers: 0,
            fetcher: None,
            watch,
        }
    }

    pub fn apply_options(&mut self, opts: &QueryOptions) {
        if let Some(v) = opts.stale_time {
            self.stale_time = v;
        }
        if let Some(v) = opts.gc_time {
            self.gc_time = v;
        }
        if let Some(v) = opts.retry_limit {
            self.retry_limit = v;
        }
    }

    /// Fresh data needs no fetch: present, not invalidated, within
    /// `stale_time` of the last successful fetch.
    pub fn is_fresh(&self) -> bool {
        !self.invalidated
            && self.data.is_some()
            && self.fetched_at.is_some_and(|t| t.elapsed() <= self.stale_time)
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
        }
    }

    /// Push the current state to every observer. `send_modify` updates
    /// unconditionally, even with zero receivers.
    pub fn notify(&self) {
        let snapshot = self.snapshot();
        self.watch.send_modify(|s| *s = snapshot);
    }
}
