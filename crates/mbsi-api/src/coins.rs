// Coin ledger endpoints.
//
// The balance endpoint uses the standard `{ data: ... }` envelope; the
// transaction listing is returned bare with its own pagination block.

use serde_json::json;

use crate::client::PortalClient;
use crate::error::Error;
use crate::model::{CoinBalance, Envelope, TransactionPage};

impl PortalClient {
    /// Fetch the current coin balance.
    pub async fn coin_balance(&self) -> Result<CoinBalance, Error> {
        let envelope: Envelope<CoinBalance> = self.get("/api/coins/balance").await?;
        Ok(envelope.data)
    }

    /// Fetch one page of the transaction ledger.
    pub async fn transactions(&self, page: u32, limit: u32) -> Result<TransactionPage, Error> {
        self.get_query(
            "/api/coins/transactions",
            &[("page", page.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    /// Mark a single transaction as read.
    pub async fn mark_transaction_read(&self, transaction_id: &str) -> Result<(), Error> {
        let path = format!("/api/coins/transactions/{transaction_id}/read");
        self.post_no_content(&path, &json!({})).await
    }
}
