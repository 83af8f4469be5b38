//! Session lifecycle: token persistence, startup verification, and the
//! global reaction to a rejected credential.
//!
//! [`SessionGuard`] owns the relationship between the [`TokenStore`] and
//! the [`PortalClient`](mbsi_api::PortalClient): it loads a persisted
//! token at startup, verifies it against the account endpoint, and
//! publishes the resulting [`SessionState`] over a `watch` channel.
//! [`SessionGuard::spawn_rejection_listener`] subscribes to the client's
//! auth events so that a 401 anywhere in the program tears the session
//! down exactly once.

mod routes;
mod store;

use std::sync::Arc;

use mbsi_api::{Account, AuthEvent, PortalClient};
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::query::QueryCache;

pub use routes::{Route, RouteDecision, route_access};
pub use store::{MemoryTokenStore, TokenStore};

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token, or the token was cleared by logout.
    Unauthenticated,
    /// A persisted token exists and is being checked against the portal.
    Verifying,
    /// The token was accepted; the account is known.
    Authenticated,
    /// The portal rejected the token (401); it has been discarded.
    Rejected,
}

struct GuardInner {
    client: PortalClient,
    cache: QueryCache,
    token_store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    account: watch::Sender<Option<Account>>,
}

/// Session state machine shared by every surface of the program.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<GuardInner>,
}

impl SessionGuard {
    pub fn new(client: PortalClient, cache: QueryCache, token_store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        let (account, _) = watch::channel(None);
        Self {
            inner: Arc::new(GuardInner {
                client,
                cache,
                token_store,
                state,
                account,
            }),
        }
    }

    /// Load any persisted token and verify it against the portal.
    ///
    /// With no persisted token this resolves to `Unauthenticated` without
    /// a network call. Any verification failure, authorization or
    /// transport, discards the persisted token and lands the session in
    /// `Rejected`: a candidate session that cannot be confirmed is
    /// treated as no session.
    pub async fn verify(&self) -> Result<SessionState, CoreError> {
        let Some(token) = self.inner.token_store.load()? else {
            debug!("no persisted token");
            self.inner.state.send_replace(SessionState::Unauthenticated);
            return Ok(SessionState::Unauthenticated);
        };

        self.inner.state.send_replace(SessionState::Verifying);
        self.inner.client.set_token(token);

        match self.inner.client.me().await {
            Ok(account) => {
                info!(user = %account.display_name(), "session verified");
                self.inner.account.send_replace(Some(account));
                self.inner.state.send_replace(SessionState::Authenticated);
                Ok(SessionState::Authenticated)
            }
            Err(err) => {
                warn!("verification failed, discarding persisted token: {err}");
                self.inner.token_store.clear()?;
                self.inner.client.clear_token();
                self.inner.state.send_replace(SessionState::Rejected);
                Ok(SessionState::Rejected)
            }
        }
    }

    /// Exchange credentials for a session, persist the token, and mark
    /// the session authenticated.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Account, CoreError> {
        let session = self
            .inner
            .client
            .login(username, password)
            .await
            .map_err(CoreError::from)?;

        self.inner.token_store.save(&session.token)?;
        self.inner.client.set_token(session.token.clone());

        let account = match session.student {
            Some(account) => account,
            None => self.inner.client.me().await?,
        };
        info!(user = %account.display_name(), "logged in");
        self.inner.account.send_replace(Some(account.clone()));
        self.inner.state.send_replace(SessionState::Authenticated);
        Ok(account)
    }

    /// Drop the session: clear the persisted token, the client's bearer
    /// credential, and every cached query.
    pub fn logout(&self) -> Result<(), CoreError> {
        self.inner.token_store.clear()?;
        self.inner.client.clear_token();
        self.inner.cache.clear();
        self.inner.account.send_replace(None);
        self.inner.state.send_replace(SessionState::Unauthenticated);
        info!("logged out");
        Ok(())
    }

    /// React to session rejections raised anywhere in the program.
    ///
    /// The client broadcasts [`AuthEvent::SessionRejected`] when any
    /// request comes back 401; this task discards the persisted token,
    /// drops the cache, and flips the session to `Rejected`. The spawned
    /// task ends when the client side of the channel is dropped.
    pub fn spawn_rejection_listener(&self) -> tokio::task::JoinHandle<()> {
        let guard = self.clone();
        let mut events = guard.inner.client.auth_events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SessionRejected) => {
                        warn!("session rejected by portal, clearing credentials");
                        if let Err(err) = guard.inner.token_store.clear() {
                            warn!("failed to clear persisted token: {err}");
                        }
                        guard.inner.cache.clear();
                        guard.inner.account.send_replace(None);
                        guard.inner.state.send_replace(SessionState::Rejected);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Subscribe to session state changes.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// The verified account, if the session is authenticated.
    pub fn account(&self) -> Option<Account> {
        self.inner.account.borrow().clone()
    }

    /// Decide access for a destination under the current session state.
    pub fn route(&self, route: Route) -> RouteDecision {
        route_access(route, self.state())
    }
}
