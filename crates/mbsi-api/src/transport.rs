// Shared transport configuration for building the portal HTTP client.
//
// Timeout and base-URL settings live here so tests and the CLI construct
// clients the same way.

use std::time::Duration;

use url::Url;

/// Transport configuration for [`PortalClient`](crate::PortalClient).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Portal root URL (e.g. `https://portal.mbsi.school`).
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl TransportConfig {
    /// Create a config for the given portal root with the default timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("mbsi-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}
