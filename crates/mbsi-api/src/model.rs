//! Wire types for the portal REST API.
//!
//! Field names follow the portal's camelCase JSON; MongoDB-style `_id`
//! identifiers are renamed to `id`. Most endpoints wrap their payload in
//! `{ "data": ... }` — [`Envelope`] strips that before callers see it.
//! The transaction listing is the one exception: it returns a bare
//! [`TransactionPage`] at the top level.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// The `{ "data": ... }` wrapper most portal responses use.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

// ── Accounts ─────────────────────────────────────────────────────────

/// An authenticated portal account (student or parent).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub coin_balance: Option<i64>,
}

impl Account {
    /// `"First Last"` with missing parts skipped.
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Opaque bearer credential; presence in the token store is what
    /// makes a candidate session.
    pub token: SecretString,
    #[serde(default)]
    pub student: Option<Account>,
}

/// Payload for `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Payload for `PUT /api/users/me`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    pub first_name: String,
    pub last_name: String,
}

// ── Weekly statistics ────────────────────────────────────────────────

/// Weekly grade/ranking snapshot for one student.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStatistics {
    #[serde(default)]
    pub simple_stats: Option<SimpleStats>,
    #[serde(default)]
    pub rankings: Option<WeeklyRankings>,
}

/// Aggregate grade counters for the week.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimpleStats {
    #[serde(default)]
    pub total_sum: i64,
    #[serde(default)]
    pub total_grades: i64,
}

/// School- and class-level standings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRankings {
    #[serde(default)]
    pub school_rank: Option<i64>,
    #[serde(default)]
    pub school_total_students: Option<i64>,
    #[serde(default)]
    pub class_ranks: Vec<ClassRank>,
}

/// Standing within a single class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassRank {
    #[serde(default)]
    pub class: Option<ClassRef>,
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub total_students: Option<i64>,
}

/// Minimal class reference embedded in rankings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassRef {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Coin ledger ──────────────────────────────────────────────────────

/// Current coin balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CoinBalance {
    #[serde(default)]
    pub coin_balance: i64,
}

/// One coin ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoinTransaction {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: Option<bool>,
}

/// One page of the transaction listing (returned without the envelope).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    #[serde(default)]
    pub transactions: Vec<CoinTransaction>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Paging metadata on the transaction listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub has_prev_page: bool,
    #[serde(default)]
    pub has_next_page: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_display_name_skips_missing_parts() {
        let mut acc = Account {
            id: "s1".into(),
            first_name: Some("Aziza".into()),
            last_name: None,
            username: None,
            role: None,
            coin_balance: None,
        };
        assert_eq!(acc.display_name(), "Aziza");
        acc.last_name = Some("Karimova".into());
        assert_eq!(acc.display_name(), "Aziza Karimova");
    }

    #[test]
    fn account_deserializes_mongo_id() {
        let acc: Account = serde_json::from_str(
            r#"{"_id":"abc123","firstName":"Aziza","coinBalance":12}"#,
        )
        .unwrap();
        assert_eq!(acc.id, "abc123");
        assert_eq!(acc.coin_balance, Some(12));
    }

    #[test]
    fn transaction_page_tolerates_missing_pagination() {
        let page: TransactionPage = serde_json::from_str(r#"{"transactions":[]}"#).unwrap();
        assert!(page.transactions.is_empty());
        assert!(page.pagination.is_none());
    }
}
