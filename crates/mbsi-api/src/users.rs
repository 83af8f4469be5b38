// Profile endpoints.

use crate::client::PortalClient;
use crate::error::Error;
use crate::model::{Account, Envelope, UpdateProfile};

impl PortalClient {
    /// Update the authenticated account's profile fields.
    pub async fn update_profile(&self, update: &UpdateProfile) -> Result<Account, Error> {
        let envelope: Envelope<Account> = self.put("/api/users/me", update).await?;
        Ok(envelope.data)
    }
}
