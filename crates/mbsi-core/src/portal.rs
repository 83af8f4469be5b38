// ── Portal facade ──
//
// Central entry point tying the API client, the query cache, and the
// session guard together. Surfaces (the CLI today) construct one
// `Portal` and go through its typed accessors; every read below routes
// through the cache, every write through the mutation layer.

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use mbsi_api::{
    Account, CoinBalance, PortalClient, TransactionPage, TransportConfig, UpdateProfile,
    WeeklyStatistics,
};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::CoreError;
use crate::query::{
    CacheDefaults, Fetcher, Mutation, OptimisticMutation, QueryCache, QueryKey, QueryOptions,
    QuerySnapshot,
};
use crate::session::{SessionGuard, TokenStore};

/// Query-key namespace. One factory per feature keeps key construction
/// in a single place so invalidation prefixes never drift from the keys
/// reads are stored under.
pub mod keys {
    use std::collections::BTreeMap;

    use crate::query::{QueryKey, QueryKeys};

    pub fn auth() -> QueryKeys {
        QueryKeys::new("auth")
    }

    /// `("auth", "detail", "me")` -- the verified account.
    pub fn me() -> QueryKey {
        auth().detail("me")
    }

    pub fn statistics() -> QueryKeys {
        QueryKeys::new("statistics")
    }

    /// `("statistics", "detail", {id})` -- one student's weekly numbers.
    pub fn weekly(student_id: &str) -> QueryKey {
        statistics().detail(student_id)
    }

    pub fn coins() -> QueryKeys {
        QueryKeys::new("coins")
    }

    /// `("coins", "detail", "balance")`.
    pub fn coin_balance() -> QueryKey {
        coins().detail("balance")
    }

    /// `("coins", "list", {page, limit})` -- one page of the ledger.
    pub fn transactions(page: u32, limit: u32) -> QueryKey {
        let mut params = BTreeMap::new();
        params.insert("page".to_owned(), page.to_string());
        params.insert("limit".to_owned(), limit.to_string());
        coins().list(params)
    }
}

/// How the facade is wired up.
pub struct PortalConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub cache: CacheDefaults,
}

impl PortalConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
            cache: CacheDefaults::default(),
        }
    }
}

/// The application core: API client + query cache + session guard.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Portal {
    client: PortalClient,
    cache: QueryCache,
    session: SessionGuard,
}

impl Portal {
    pub fn new(config: &PortalConfig, token_store: Arc<dyn TokenStore>) -> Result<Self, CoreError> {
        let transport =
            TransportConfig::new(config.base_url.clone()).with_timeout(config.timeout);
        let client = PortalClient::new(&transport).map_err(CoreError::from)?;
        let cache = QueryCache::new(config.cache.clone());
        let session = SessionGuard::new(client.clone(), cache.clone(), token_store);
        Ok(Self {
            client,
            cache,
            session,
        })
    }

    pub fn client(&self) -> &PortalClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    // ── Cached reads ─────────────────────────────────────────────────

    /// The verified account, cached under [`keys::me`].
    pub async fn me(&self) -> Result<Account, CoreError> {
        let client = self.client.clone();
        self.read_as(
            &keys::me(),
            QueryOptions::default(),
            fetcher(move || {
                let client = client.clone();
                async move { client.me().await }
            }),
        )
        .await
    }

    /// Weekly statistics for a student, cached per student id.
    pub async fn weekly_statistics(&self, student_id: &str) -> Result<WeeklyStatistics, CoreError> {
        let client = self.client.clone();
        let id = student_id.to_owned();
        self.read_as(
            &keys::weekly(student_id),
            QueryOptions::default(),
            fetcher(move || {
                let client = client.clone();
                let id = id.clone();
                async move { client.student_weekly(&id).await }
            }),
        )
        .await
    }

    pub async fn coin_balance(&self) -> Result<CoinBalance, CoreError> {
        let client = self.client.clone();
        self.read_as(
            &keys::coin_balance(),
            QueryOptions::default(),
            fetcher(move || {
                let client = client.clone();
                async move { client.coin_balance().await }
            }),
        )
        .await
    }

    /// One page of the coin ledger, cached per `(page, limit)`.
    pub async fn transactions(&self, page: u32, limit: u32) -> Result<TransactionPage, CoreError> {
        let client = self.client.clone();
        self.read_as(
            &keys::transactions(page, limit),
            QueryOptions::default(),
            fetcher(move || {
                let client = client.clone();
                async move { client.transactions(page, limit).await }
            }),
        )
        .await
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Update the account profile, then refetch the cached account.
    pub async fn update_profile(&self, update: &UpdateProfile) -> Result<Account, CoreError> {
        let client = self.client.clone();
        let update = update.clone();
        let account = Mutation::new(self.cache.clone())
            .invalidates(keys::auth().all())
            .run(async move {
                client
                    .update_profile(&update)
                    .await
                    .map_err(CoreError::from)
            })
            .await?;
        Ok(account)
    }

    /// Mark a ledger transaction as read, optimistically.
    ///
    /// The cached page at `(page, limit)` is patched immediately (the
    /// matching transaction's `read` flag flips to `true`); if the portal
    /// rejects the call the page is restored to its pre-patch value. The
    /// whole coins namespace is refetched when the mutation settles.
    pub async fn mark_transaction_read(
        &self,
        transaction_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<(), CoreError> {
        let client = self.client.clone();
        let id = transaction_id.to_owned();
        let target = keys::transactions(page, limit);
        let patch_id = id.clone();

        OptimisticMutation::new(self.cache.clone(), target)
            .invalidates(keys::coins().all())
            .run(
                move |current| {
                    let mut value = current?;
                    if let Some(items) = value
                        .get_mut("transactions")
                        .and_then(Value::as_array_mut)
                    {
                        for item in items {
                            if item.get("_id").and_then(Value::as_str) == Some(&patch_id) {
                                item["read"] = Value::Bool(true);
                            }
                        }
                    }
                    Some(value)
                },
                async move {
                    client
                        .mark_transaction_read(&id)
                        .await
                        .map_err(CoreError::from)
                },
            )
            .await
    }

    // ── Session passthrough ──────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Account, CoreError> {
        self.session.login(username, password).await
    }

    pub fn logout(&self) -> Result<(), CoreError> {
        self.session.logout()
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn read_as<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
        opts: QueryOptions,
        fetcher: Fetcher,
    ) -> Result<T, CoreError> {
        let snapshot = self.cache.read(key, opts, fetcher).await;
        decode_snapshot(key, &snapshot)
    }
}

/// Adapt a typed API call into the cache's untyped [`Fetcher`] shape.
/// The factory is re-invoked on every attempt, so retries issue a fresh
/// request.
pub fn fetcher<T, F, Fut>(factory: F) -> Fetcher
where
    T: Serialize,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, mbsi_api::Error>> + Send + 'static,
{
    Arc::new(move || {
        let fut = factory();
        async move {
            let value = fut.await.map_err(CoreError::from)?;
            serde_json::to_value(value).map_err(CoreError::from)
        }
        .boxed()
    })
}

fn decode_snapshot<T: DeserializeOwned>(
    key: &QueryKey,
    snapshot: &QuerySnapshot,
) -> Result<T, CoreError> {
    if let Some(data) = &snapshot.data {
        if snapshot.is_error() {
            debug!(key = %key, "serving stale data after fetch error");
        }
        return Ok(serde_json::from_value(data.clone())?);
    }
    if let Some(message) = &snapshot.error {
        return Err(CoreError::Query {
            message: message.clone(),
        });
    }
    Err(CoreError::Query {
        message: format!("no data for {key}"),
    })
}
