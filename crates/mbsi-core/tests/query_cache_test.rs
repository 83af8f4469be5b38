//! Behavioral tests for the query cache: deduplication, staleness,
//! retries, invalidation, garbage collection, and optimistic rollback.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::sync::Notify;

use mbsi_core::error::CoreError;
use mbsi_core::query::{
    CacheDefaults, Fetcher, Mutation, OptimisticMutation, QueryCache, QueryKey, QueryKeys,
    QueryOptions, QueryStatus,
};

fn key(name: &str) -> QueryKey {
    QueryKey::new().text(name)
}

/// A fetcher that counts invocations and maps the attempt number to a
/// canned result.
fn scripted(
    counter: Arc<AtomicU32>,
    script: impl Fn(u32) -> Result<Value, CoreError> + Send + Sync + 'static,
) -> Fetcher {
    Arc::new(move || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        let result = script(attempt);
        async move { result }.boxed()
    })
}

fn always_ok(counter: Arc<AtomicU32>, value: Value) -> Fetcher {
    scripted(counter, move |_| Ok(value.clone()))
}

#[tokio::test]
async fn concurrent_reads_share_one_fetch() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher: Fetcher = {
        let counter = counter.clone();
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(json!({"n": 7}))
            }
            .boxed()
        })
    };

    let k = key("stats");
    let (a, b) = tokio::join!(
        cache.read(&k, QueryOptions::default(), fetcher.clone()),
        cache.read(&k, QueryOptions::default(), fetcher.clone()),
    );

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(a.is_success());
    assert!(b.is_success());
    assert_eq!(a.data, Some(json!({"n": 7})));
    assert_eq!(b.data, Some(json!({"n": 7})));
}

#[tokio::test]
async fn fresh_data_is_served_without_a_fetch() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = always_ok(counter.clone(), json!(1));

    let k = key("me");
    cache.read(&k, QueryOptions::default(), fetcher.clone()).await;
    let second = cache.read(&k, QueryOptions::default(), fetcher).await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(second.data, Some(json!(1)));
}

#[tokio::test]
async fn disabled_reads_stay_idle() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = always_ok(counter.clone(), json!(1));

    let k = key("me");
    let snap = cache.read(&k, QueryOptions::disabled(), fetcher.clone()).await;
    assert_eq!(snap.status, QueryStatus::Idle);
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // Enabling the same key later fetches normally.
    let snap = cache.read(&k, QueryOptions::default(), fetcher).await;
    assert!(snap.is_success());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_fetch_retries_once_by_default() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = scripted(counter.clone(), |attempt| {
        if attempt == 0 {
            Err(CoreError::Timeout)
        } else {
            Ok(json!("recovered"))
        }
    });

    let snap = cache.read(&key("flaky"), QueryOptions::default(), fetcher).await;
    assert!(snap.is_success());
    assert_eq!(snap.data, Some(json!("recovered")));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_fetch_keeps_stale_data() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = scripted(counter.clone(), |attempt| {
        if attempt == 0 {
            Ok(json!({"balance": 40}))
        } else {
            Err(CoreError::Timeout)
        }
    });
    let opts = QueryOptions::default()
        .stale_time(Duration::ZERO)
        .retry_limit(0);

    let k = key("balance");
    let first = cache.read(&k, opts, fetcher.clone()).await;
    assert!(first.is_success());

    // Zero stale time forces a refetch, which now fails: the error is
    // surfaced but the previous value is not thrown away.
    let second = cache.read(&k, opts, fetcher).await;
    assert!(second.is_error());
    assert_eq!(second.data, Some(json!({"balance": 40})));
    assert!(second.error.is_some());
}

#[tokio::test]
async fn invalidation_is_idempotent_and_refetches_on_next_read() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = always_ok(counter.clone(), json!(1));

    let k = key("me");
    cache.read(&k, QueryOptions::default(), fetcher.clone()).await;

    cache.invalidate(&k);
    cache.invalidate(&k);
    assert_eq!(cache.get_data(&k), Some(json!(1)));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    cache.read(&k, QueryOptions::default(), fetcher).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidating_an_observed_key_refetches_immediately() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = scripted(counter.clone(), |attempt| Ok(json!({"v": attempt})));

    let k = key("watched");
    let mut observer = cache.observe(&k);
    cache.read(&k, QueryOptions::default(), fetcher).await;

    cache.invalidate(&k);
    let refetched = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let snap = observer.changed().await.unwrap();
            if snap.data == Some(json!({"v": 1})) {
                return snap;
            }
        }
    })
    .await
    .unwrap();

    assert!(refetched.is_success());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn prefix_invalidation_spares_other_features() {
    let cache = QueryCache::default();
    let coins = QueryKeys::new("coins");
    let auth = QueryKeys::new("auth");

    let page = coins.list([("page", 1)]);
    let balance = coins.detail("balance");
    let me = auth.detail("me");
    cache.set_data(&page, json!([1, 2]));
    cache.set_data(&balance, json!(40));
    cache.set_data(&me, json!({"name": "dana"}));

    let matched = cache.invalidate(&coins.all());
    assert_eq!(matched.len(), 2);
    assert!(matched.contains(&page));
    assert!(matched.contains(&balance));

    // The auth entry is untouched: reading it again serves from cache.
    let counter = Arc::new(AtomicU32::new(0));
    let snap = cache
        .read(&me, QueryOptions::default(), always_ok(counter.clone(), json!(0)))
        .await;
    assert_eq!(snap.data, Some(json!({"name": "dana"})));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancelled_fetch_cannot_clobber_a_newer_write() {
    let cache = QueryCache::default();
    let gate = Arc::new(Notify::new());
    let fetcher: Fetcher = {
        let gate = gate.clone();
        Arc::new(move || {
            let gate = gate.clone();
            async move {
                gate.notified().await;
                Ok(json!("from the wire"))
            }
            .boxed()
        })
    };

    let k = key("ledger");
    let reader = tokio::spawn({
        let cache = cache.clone();
        let k = k.clone();
        async move { cache.read(&k, QueryOptions::default(), fetcher).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // An optimistic write supersedes the in-flight fetch.
    cache.cancel(&k);
    cache.set_data(&k, json!("optimistic"));

    // The fetch now completes, but its generation is stale: dropped.
    gate.notify_waiters();
    reader.await.unwrap();
    assert_eq!(cache.get_data(&k), Some(json!("optimistic")));
}

#[tokio::test]
async fn sweep_evicts_unobserved_entries_past_gc_time() {
    let cache = QueryCache::new(CacheDefaults {
        gc_time: Duration::from_millis(1),
        ..CacheDefaults::default()
    });

    let watched = key("watched");
    let abandoned = key("abandoned");
    cache.set_data(&watched, json!(1));
    cache.set_data(&abandoned, json!(2));
    let _observer = cache.observe(&watched);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let evicted = cache.sweep();

    assert_eq!(evicted, 1);
    assert_eq!(cache.get_data(&abandoned), None);
    assert_eq!(cache.get_data(&watched), Some(json!(1)));
}

#[tokio::test]
async fn optimistic_rollback_restores_the_exact_previous_value() {
    let cache = QueryCache::default();
    let k = key("balance");
    cache.set_data(&k, json!({"coins": 3}));

    let result: Result<(), CoreError> = OptimisticMutation::new(cache.clone(), k.clone())
        .run(
            |_| Some(json!({"coins": 2})),
            async {
                Err(CoreError::Api {
                    message: "spend rejected".into(),
                    status: Some(422),
                })
            },
        )
        .await;

    assert!(result.is_err());
    assert_eq!(cache.get_data(&k), Some(json!({"coins": 3})));
}

#[tokio::test]
async fn optimistic_rollback_restores_absence() {
    let cache = QueryCache::default();
    let k = key("balance");

    let result: Result<(), CoreError> = OptimisticMutation::new(cache.clone(), k.clone())
        .run(
            |_| Some(json!({"coins": 2})),
            async { Err(CoreError::Timeout) },
        )
        .await;

    assert!(result.is_err());
    assert_eq!(cache.get_data(&k), None);
}

#[tokio::test]
async fn optimistic_mutation_settles_its_target_without_explicit_prefixes() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = scripted(counter.clone(), |attempt| Ok(json!({"v": attempt})));

    let k = key("balance");
    let _observer = cache.observe(&k);
    cache.read(&k, QueryOptions::default(), fetcher).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // No invalidation prefix given: the target itself must still
    // reconcile with the server on settle.
    let result: Result<(), CoreError> = OptimisticMutation::new(cache.clone(), k.clone())
        .run(|_| Some(json!({"v": 99})), async { Ok(()) })
        .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(cache.get_data(&k), Some(json!({"v": 1})));
}

#[tokio::test]
async fn mutation_settles_by_refetching_observed_keys() {
    let cache = QueryCache::default();
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = scripted(counter.clone(), |attempt| Ok(json!({"v": attempt})));

    let k = key("profile");
    let _observer = cache.observe(&k);
    cache.read(&k, QueryOptions::default(), fetcher).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let result: Result<(), CoreError> = Mutation::new(cache.clone())
        .invalidates(k.clone())
        .run(async { Ok(()) })
        .await;

    assert!(result.is_ok());
    // Settle is awaited: the refetch has already happened.
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(cache.get_data(&k), Some(json!({"v": 1})));
}
