// ── Core error types ──
//
// User-facing errors from mbsi-core. These are NOT transport-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<mbsi_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The portal rejected the session credential. The guard has already
    /// cleared the persisted token by the time this surfaces.
    #[error("Session rejected -- please log in again")]
    SessionRejected,

    #[error("Not logged in")]
    NotLoggedIn,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the portal: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    /// A cached read settled in the error state with no data to fall
    /// back on.
    #[error("Query failed: {message}")]
    Query { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Portal error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unexpected portal response: {message}")]
    Data { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<mbsi_api::Error> for CoreError {
    fn from(err: mbsi_api::Error) -> Self {
        match err {
            mbsi_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            mbsi_api::Error::SessionRejected => CoreError::SessionRejected,
            mbsi_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            mbsi_api::Error::InvalidUrl(e) => CoreError::ValidationFailed {
                message: format!("invalid portal URL: {e}"),
            },
            mbsi_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            mbsi_api::Error::Deserialization { message, .. } => CoreError::Data { message },
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Data {
            message: err.to_string(),
        }
    }
}
