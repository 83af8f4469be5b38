use thiserror::Error;

/// Top-level error type for the `mbsi-api` crate.
///
/// Covers every transport-level failure mode. `mbsi-core` maps these into
/// user-facing diagnostics; consumers of that crate never see raw HTTP
/// status codes or JSON parse failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or registration rejected by the portal (wrong credentials,
    /// locked account, duplicate username).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The portal answered 401 — the bearer credential is expired or
    /// invalid. The token cell has already been cleared and
    /// [`AuthEvent::SessionRejected`](crate::AuthEvent) broadcast by the
    /// time the caller sees this.
    #[error("Session rejected -- re-authentication required")]
    SessionRejected,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Portal API ──────────────────────────────────────────────────
    /// Non-success, non-401 status from the portal.
    #[error("Portal API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates the session is gone and
    /// re-authentication might resolve it.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::SessionRejected | Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
