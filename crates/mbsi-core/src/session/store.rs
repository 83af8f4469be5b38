// ── Token persistence seam ──

use secrecy::SecretString;

use crate::error::CoreError;

/// Where the bearer token lives between invocations.
///
/// The core crate never touches disk or OS keychains itself; concrete
/// stores (keyring, config file) live in `mbsi-config`, and tests use
/// [`MemoryTokenStore`].
pub trait TokenStore: Send + Sync {
    /// Load the persisted token, if any.
    fn load(&self) -> Result<Option<SecretString>, CoreError>;

    /// Persist a freshly issued token.
    fn save(&self, token: &SecretString) -> Result<(), CoreError>;

    /// Remove the persisted token. Removing an absent token is not an error.
    fn clear(&self) -> Result<(), CoreError>;
}

/// In-process store, used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: std::sync::RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: SecretString) -> Self {
        Self {
            token: std::sync::RwLock::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<SecretString>, CoreError> {
        Ok(self.token.read().expect("token lock poisoned").clone())
    }

    fn save(&self, token: &SecretString) -> Result<(), CoreError> {
        *self.token.write().expect("token lock poisoned") = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        *self.token.write().expect("token lock poisoned") = None;
        Ok(())
    }
}
