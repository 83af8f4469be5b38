//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use mbsi_core::CoreError;

/// Exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the portal")]
    #[diagnostic(
        code(mbsi::connection_failed),
        help(
            "Check your network connection and the portal URL.\n\
             Current URL: {url}\n\
             Override with --portal or MBSI_PORTAL."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(mbsi::timeout),
        help("Increase the timeout with --timeout or try again later.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Login failed: {message}")]
    #[diagnostic(
        code(mbsi::login_failed),
        help("Check your username and password, then run: mbsi login")
    )]
    LoginFailed { message: String },

    #[error("Your session has expired")]
    #[diagnostic(
        code(mbsi::session_expired),
        help("The portal rejected the saved session. Run: mbsi login")
    )]
    SessionExpired,

    #[error("Not logged in")]
    #[diagnostic(code(mbsi::not_logged_in), help("Run: mbsi login"))]
    NotLoggedIn,

    // ── Portal ───────────────────────────────────────────────────────

    #[error("Portal error: {message}")]
    #[diagnostic(code(mbsi::portal_error))]
    Portal {
        message: String,
        status: Option<u16>,
    },

    #[error("Unexpected portal response: {message}")]
    #[diagnostic(
        code(mbsi::bad_response),
        help("The portal may have changed its API. Try updating mbsi.")
    )]
    BadResponse { message: String },

    // ── Validation / configuration ───────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mbsi::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(mbsi::config),
        help("Run: mbsi get-started to create a fresh configuration.")
    )]
    Config(String),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Interactive prompt failed: {0}")]
    #[diagnostic(
        code(mbsi::prompt),
        help("Pass the value as a flag instead (see --help).")
    )]
    Prompt(String),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(mbsi::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(mbsi::internal))]
    Internal(String),
}

impl From<mbsi_config::ConfigError> for CliError {
    fn from(err: mbsi_config::ConfigError) -> Self {
        match err {
            mbsi_config::ConfigError::Validation { field, reason } => {
                Self::Validation { field, reason }
            }
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Prompt(err.to_string())
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::LoginFailed { .. } | Self::SessionExpired | Self::NotLoggedIn => exit_code::AUTH,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::LoginFailed { message },

            CoreError::SessionRejected => CliError::SessionExpired,

            CoreError::NotLoggedIn => CliError::NotLoggedIn,

            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed {
                url: String::new(),
                reason,
            },

            CoreError::Timeout => CliError::Timeout { seconds: 30 },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Query { message } => CliError::Portal {
                message,
                status: None,
            },

            CoreError::Api { message, status } => CliError::Portal { message, status },

            CoreError::Data { message } => CliError::BadResponse { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
