//! End-to-end tests for the portal facade: cached reads against a mock
//! portal, profile mutations, and the optimistic mark-read flow.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mbsi_core::session::MemoryTokenStore;
use mbsi_core::{Portal, PortalConfig, UpdateProfile, keys};

async fn setup() -> (MockServer, Portal) {
    let server = MockServer::start().await;
    let config = PortalConfig::new(server.uri().parse().unwrap());
    let portal = Portal::new(&config, Arc::new(MemoryTokenStore::new())).unwrap();
    (server, portal)
}

fn transactions_body(read: bool) -> Value {
    json!({
        "transactions": [
            {"_id": "t1", "description": "Homework bonus", "amount": 5, "read": read},
            {"_id": "t2", "description": "Quiz reward", "amount": 3, "read": true},
        ],
        "pagination": {"page": 1, "totalPages": 1, "hasPrevPage": false, "hasNextPage": false},
    })
}

#[tokio::test]
async fn account_is_fetched_once_and_then_served_from_cache() {
    let (server, portal) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"_id": "stu-1", "firstName": "Dana", "lastName": "Ilan", "username": "dana"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let first = portal.me().await.unwrap();
    let second = portal.me().await.unwrap();

    assert_eq!(first.id, "stu-1");
    assert_eq!(first, second);
}

#[tokio::test]
async fn weekly_statistics_decode_per_student() {
    let (server, portal) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/statistics/weekly/current/stu-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "simpleStats": {"totalSum": 540, "totalGrades": 6},
                "rankings": {
                    "schoolRank": 12,
                    "schoolTotalStudents": 400,
                    "classRanks": [
                        {"class": {"_id": "c1", "name": "7B"}, "rank": 2, "totalStudents": 28}
                    ],
                },
            }
        })))
        .mount(&server)
        .await;

    let stats = portal.weekly_statistics("stu-1").await.unwrap();

    let simple = stats.simple_stats.unwrap();
    assert_eq!(simple.total_sum, 540);
    let rankings = stats.rankings.unwrap();
    assert_eq!(rankings.school_rank, Some(12));
    assert_eq!(rankings.class_ranks[0].rank, Some(2));
}

#[tokio::test]
async fn weekly_statistics_tolerate_missing_sections() {
    let (server, portal) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/statistics/weekly/current/stu-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;

    let stats = portal.weekly_statistics("stu-2").await.unwrap();

    assert!(stats.simple_stats.is_none());
    assert!(stats.rankings.is_none());
}

#[tokio::test]
async fn transactions_are_cached_per_page() {
    let (server, portal) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/coins/transactions"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_body(false)))
        .expect(1)
        .mount(&server)
        .await;

    let page = portal.transactions(1, 10).await.unwrap();
    let again = portal.transactions(1, 10).await.unwrap();

    assert_eq!(page.transactions.len(), 2);
    assert_eq!(page, again);
}

#[tokio::test]
async fn marking_a_transaction_read_patches_the_cached_page() {
    let (server, portal) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/coins/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_body(false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/coins/transactions/t1/read"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    portal.transactions(1, 10).await.unwrap();
    portal.mark_transaction_read("t1", 1, 10).await.unwrap();

    let cached = portal.cache().get_data(&keys::transactions(1, 10)).unwrap();
    assert_eq!(cached["transactions"][0]["read"], json!(true));
    // Untouched entries keep their flags.
    assert_eq!(cached["transactions"][1]["read"], json!(true));
}

#[tokio::test]
async fn rejected_mark_read_rolls_the_page_back() {
    let (server, portal) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/coins/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_body(false)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/coins/transactions/t1/read"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "ledger unavailable"})),
        )
        .mount(&server)
        .await;

    portal.transactions(1, 10).await.unwrap();
    let result = portal.mark_transaction_read("t1", 1, 10).await;

    assert!(result.is_err());
    let cached = portal.cache().get_data(&keys::transactions(1, 10)).unwrap();
    assert_eq!(cached["transactions"][0]["read"], json!(false));
}

#[tokio::test]
async fn profile_update_refreshes_the_cached_account() {
    let (server, portal) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"_id": "stu-1", "firstName": "Dana", "lastName": "Ilan", "username": "dana"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"_id": "stu-1", "firstName": "Dana", "lastName": "Levy", "username": "dana"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    portal.me().await.unwrap();
    let updated = portal
        .update_profile(&UpdateProfile {
            first_name: "Dana".into(),
            last_name: "Levy".into(),
        })
        .await
        .unwrap();

    assert_eq!(updated.last_name.as_deref(), Some("Levy"));
}
