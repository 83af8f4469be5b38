//! Shared configuration for the MBSI portal CLI.
//!
//! TOML config file, environment overrides, and the concrete token
//! stores (OS keyring, plaintext file) behind `mbsi_core`'s
//! [`TokenStore`] seam. The core crate never touches disk or keychains;
//! everything filesystem-shaped lives here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use mbsi_core::{CoreError, PortalConfig, TokenStore};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Portal base URL.
    #[serde(default = "default_portal")]
    pub portal: String,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal: default_portal(),
            defaults: Defaults::default(),
            cache: CacheSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Transactions per ledger page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Token backend: "keyring" or "file".
    #[serde(default = "default_token_backend")]
    pub token_backend: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            page_size: default_page_size(),
            token_backend: default_token_backend(),
        }
    }
}

/// Cache tuning. Zero values fall back to the built-in defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Seconds before cached data counts as stale.
    #[serde(default)]
    pub stale_secs: Option<u64>,

    /// Seconds an unobserved entry survives before eviction.
    #[serde(default)]
    pub gc_secs: Option<u64>,

    /// Immediate retries after a failed fetch.
    #[serde(default)]
    pub retry_limit: Option<u32>,
}

fn default_portal() -> String {
    "https://portal.mbsi.school".into()
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    10
}
fn default_token_backend() -> String {
    "keyring".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("school", "mbsi", "mbsi").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("mbsi");
    p
}

// ── Config loading / saving ─────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();

    let config: Config = config_figment(&path).extract()?;
    Ok(config)
}

/// File + environment layering. Nesting in env vars uses a double
/// underscore (`MBSI_DEFAULTS__PAGE_SIZE`) so snake_case keys survive
/// the split.
fn config_figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MBSI_").split("__"))
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Translation to core types ───────────────────────────────────────

/// Build a [`PortalConfig`] from the loaded config.
pub fn to_portal_config(cfg: &Config) -> Result<PortalConfig, ConfigError> {
    let base_url: url::Url = cfg.portal.parse().map_err(|_| ConfigError::Validation {
        field: "portal".into(),
        reason: format!("invalid URL: {}", cfg.portal),
    })?;

    let mut portal = PortalConfig::new(base_url);
    portal.timeout = Duration::from_secs(cfg.defaults.timeout);
    if let Some(secs) = cfg.cache.stale_secs {
        portal.cache.stale_time = Duration::from_secs(secs);
    }
    if let Some(secs) = cfg.cache.gc_secs {
        portal.cache.gc_time = Duration::from_secs(secs);
    }
    if let Some(limit) = cfg.cache.retry_limit {
        portal.cache.retry_limit = limit;
    }
    Ok(portal)
}

// ── Token stores ────────────────────────────────────────────────────

const KEYRING_SERVICE: &str = "mbsi";
const KEYRING_USER: &str = "portal-token";

/// Bearer token in the OS keyring. The default backend.
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    fn entry() -> Result<keyring::Entry, CoreError> {
        keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .map_err(|err| CoreError::Internal(format!("keyring unavailable: {err}")))
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        match Self::entry()?.get_password() {
            Ok(token) => Ok(Some(SecretString::from(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(CoreError::Internal(format!("keyring read failed: {err}"))),
        }
    }

    fn save(&self, token: &SecretString) -> Result<(), CoreError> {
        Self::entry()?
            .set_password(token.expose_secret())
            .map_err(|err| CoreError::Internal(format!("keyring write failed: {err}")))
    }

    fn clear(&self) -> Result<(), CoreError> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(CoreError::Internal(format!("keyring delete failed: {err}"))),
        }
    }
}

/// Bearer token in a plain file next to the config. Fallback for systems
/// without a usable keyring (headless, containers).
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Token file at the canonical location (`token` next to `config.toml`).
    pub fn new() -> Self {
        let mut path = config_path();
        path.set_file_name("token");
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(SecretString::from(trimmed.to_owned())))
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CoreError::Internal(format!(
                "failed to read token file: {err}"
            ))),
        }
    }

    fn save(&self, token: &SecretString) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| CoreError::Internal(format!("failed to create {parent:?}: {err}")))?;
        }
        std::fs::write(&self.path, token.expose_secret())
            .map_err(|err| CoreError::Internal(format!("failed to write token file: {err}")))?;

        // Owner-only on unix; the token is a bearer credential.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|err| CoreError::Internal(format!("failed to chmod token file: {err}")))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CoreError::Internal(format!(
                "failed to remove token file: {err}"
            ))),
        }
    }
}

/// Pick the token store named by `defaults.token_backend`.
pub fn token_store(cfg: &Config) -> Result<std::sync::Arc<dyn TokenStore>, ConfigError> {
    match cfg.defaults.token_backend.as_str() {
        "keyring" => Ok(std::sync::Arc::new(KeyringTokenStore)),
        "file" => {
            debug!("using file token store");
            Ok(std::sync::Arc::new(FileTokenStore::new()))
        }
        other => Err(ConfigError::Validation {
            field: "token_backend".into(),
            reason: format!("expected 'keyring' or 'file', got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn file_store_round_trips_a_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::at(dir.path().join("token"));

        assert!(store.load().unwrap().is_none());
        store.save(&SecretString::from("tok-1")).unwrap();
        assert_eq!(
            store.load().unwrap().unwrap().expose_secret(),
            "tok-1"
        );

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn file_store_ignores_surrounding_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "tok-1\n").unwrap();

        let store = FileTokenStore::at(&path);
        assert_eq!(store.load().unwrap().unwrap().expose_secret(), "tok-1");
    }

    #[test]
    fn default_config_translates_to_a_portal_config() {
        let cfg = Config::default();
        let portal = to_portal_config(&cfg).unwrap();

        assert_eq!(portal.timeout, Duration::from_secs(30));
        assert_eq!(portal.base_url.as_str(), "https://portal.mbsi.school/");
    }

    #[test]
    fn invalid_portal_url_is_a_validation_error() {
        let cfg = Config {
            portal: "not a url".into(),
            ..Config::default()
        };
        assert!(matches!(
            to_portal_config(&cfg),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn env_overrides_reach_nested_snake_case_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("MBSI_DEFAULTS__PAGE_SIZE", "25");
            jail.set_env("MBSI_DEFAULTS__TOKEN_BACKEND", "file");
            jail.set_env("MBSI_PORTAL", "https://other.example");

            let cfg: Config = config_figment(Path::new("missing.toml")).extract()?;
            assert_eq!(cfg.defaults.page_size, 25);
            assert_eq!(cfg.defaults.token_backend, "file");
            assert_eq!(cfg.portal, "https://other.example");
            Ok(())
        });
    }

    #[test]
    fn cache_settings_override_the_defaults() {
        let cfg = Config {
            cache: CacheSettings {
                stale_secs: Some(60),
                gc_secs: None,
                retry_limit: Some(3),
            },
            ..Config::default()
        };
        let portal = to_portal_config(&cfg).unwrap();
        assert_eq!(portal.cache.stale_time, Duration::from_secs(60));
        assert_eq!(portal.cache.retry_limit, 3);
    }
}
