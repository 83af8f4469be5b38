// Portal HTTP client
//
// Wraps `reqwest::Client` with bearer-credential attachment, envelope
// unwrapping, and the global authorization-rejection side effect. All
// endpoint modules (auth, users, statistics, coins) are implemented as
// inherent methods via separate files to keep this module focused on
// transport mechanics.

use std::sync::{Arc, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Session-level notifications emitted by the transport.
///
/// An explicit event rather than a hidden redirect: the client only
/// *reports* that the portal rejected the credential; exactly one
/// top-level owner decides what happens next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The portal answered 401. The token cell has been cleared.
    SessionRejected,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    /// Bearer credential shared with the session guard. Absent means
    /// requests go out unauthenticated.
    token: RwLock<Option<SecretString>>,
    auth_events: broadcast::Sender<AuthEvent>,
}

/// Raw HTTP client for the MBSI portal API.
///
/// Cheap to clone (all state behind an `Arc`). Every outbound call attaches
/// the stored credential as `Authorization: Bearer <token>` when present;
/// every inbound 401 clears that credential and broadcasts
/// [`AuthEvent::SessionRejected`].
#[derive(Clone)]
pub struct PortalClient {
    inner: Arc<ClientInner>,
}

impl PortalClient {
    /// Create a new client from a [`TransportConfig`].
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        let http = config.build_client()?;
        let (auth_events, _) = broadcast::channel(16);
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.base_url.clone(),
                token: RwLock::new(None),
                auth_events,
            }),
        })
    }

    /// The portal root URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Subscribe to session-level auth events.
    pub fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.auth_events.subscribe()
    }

    // ── Token cell ───────────────────────────────────────────────────

    /// Store the bearer credential used for subsequent requests.
    pub fn set_token(&self, token: SecretString) {
        *self.inner.token.write().expect("token lock poisoned") = Some(token);
    }

    /// Drop the bearer credential (logout path).
    pub fn clear_token(&self) {
        *self.inner.token.write().expect("token lock poisoned") = None;
    }

    /// `true` if a credential is currently stored.
    pub fn has_token(&self) -> bool {
        self.inner.token.read().expect("token lock poisoned").is_some()
    }

    fn apply_bearer(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self.inner.token.read().expect("token lock poisoned");
        match guard.as_ref() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    // ── URL builder ──────────────────────────────────────────────────

    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let url = self.inner.base_url.join(path)?;
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body as `T`.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {url}");

        let resp = self.apply_bearer(self.inner.http.get(url)).send().await?;
        self.decode(resp).await
    }

    /// Send a GET request with a query string and decode the JSON body.
    pub(crate) async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {url} {query:?}");

        let resp = self
            .apply_bearer(self.inner.http.get(url).query(query))
            .send()
            .await?;
        self.decode(resp).await
    }

    /// Send a POST request with a JSON body and decode the response.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("POST {url}");

        let resp = self
            .apply_bearer(self.inner.http.post(url).json(body))
            .send()
            .await?;
        self.decode(resp).await
    }

    /// Send a POST request whose response body is ignored.
    pub(crate) async fn post_no_content(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        let url = self.api_url(path)?;
        debug!("POST {url}");

        let resp = self
            .apply_bearer(self.inner.http.post(url).json(body))
            .send()
            .await?;
        let status = resp.status();
        self.check_status(&resp)?;
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message =
                extract_message(&body).unwrap_or_else(|| body_preview(&body).to_owned());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Send a PUT request with a JSON body and decode the response.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("PUT {url}");

        let resp = self
            .apply_bearer(self.inner.http.put(url).json(body))
            .send()
            .await?;
        self.decode(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    /// Map non-success statuses to errors, applying the global 401 policy.
    fn check_status(&self, resp: &reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.reject_session();
            return Err(Error::SessionRejected);
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        self.check_status(&resp)?;

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message =
                extract_message(&body).unwrap_or_else(|| body_preview(&body).to_owned());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = body_preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    /// Clear the credential and broadcast the rejection. Global policy:
    /// fires for any call, not just a particular endpoint.
    fn reject_session(&self) {
        warn!("portal rejected the session credential");
        self.clear_token();
        // No receivers is fine -- nothing to notify yet.
        let _ = self.inner.auth_events.send(AuthEvent::SessionRejected);
    }
}

/// Pull a `message` field out of an error body, if there is one.
fn extract_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }
    serde_json::from_str::<ErrorBody>(body).ok()?.message
}

/// Longest error-body excerpt carried into error messages.
const BODY_PREVIEW_BYTES: usize = 200;

/// Truncate to at most [`BODY_PREVIEW_BYTES`], backing up to the nearest
/// character boundary so multi-byte text never splits mid-character.
fn body_preview(body: &str) -> &str {
    if body.len() <= BODY_PREVIEW_BYTES {
        return body;
    }
    let mut end = BODY_PREVIEW_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
