// Portal authentication endpoints
//
// Token-based auth: login/register return an opaque bearer credential,
// `me` verifies whichever credential the client currently carries.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::client::PortalClient;
use crate::error::Error;
use crate::model::{Account, AuthSession, Envelope, RegisterRequest};

impl PortalClient {
    /// Authenticate with username/password.
    ///
    /// On success the caller receives the bearer token; persisting it and
    /// installing it via [`PortalClient::set_token`] is the session
    /// guard's job, not the transport's.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<AuthSession, Error> {
        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let session = match self.post::<Envelope<AuthSession>>("/api/auth/login", &body).await {
            Ok(envelope) => envelope.data,
            // A 401 on login means bad credentials, not an expired session.
            Err(Error::SessionRejected) => {
                return Err(Error::Authentication {
                    message: "invalid username or password".into(),
                });
            }
            Err(e) => return Err(e),
        };

        debug!("login successful");
        Ok(session)
    }

    /// Create a new portal account.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, Error> {
        let envelope: Envelope<AuthSession> = self.post("/api/auth/register", request).await?;
        Ok(envelope.data)
    }

    /// Fetch the account behind the current credential.
    ///
    /// This is the identity-verification call: a 401 here (or anywhere
    /// else) clears the token cell and broadcasts the rejection event.
    pub async fn me(&self) -> Result<Account, Error> {
        let envelope: Envelope<Account> = self.get("/api/auth/me").await?;
        Ok(envelope.data)
    }
}
