//! Integration tests for watchlist registration and webhook notification

use bullscan::error::ScreenerError;
use bullscan::models::EntityType;
use bullscan::services::{Notifier, RestWatchlistRegistrar, WatchlistRegistrar, WebhookNotifier};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::test_utils::OPERATOR;

#[tokio::test]
async fn watchlist_posts_codes_and_group() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/watchlist"))
        .and(body_json(json!({
            "codes": ["000001", "600000"],
            "entity_type": "stock",
            "group": "bull"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let registrar = RestWatchlistRegistrar::new(&format!("{}/watchlist", server.uri())).unwrap();
    registrar
        .register(
            &["000001".to_string(), "600000".to_string()],
            EntityType::Stock,
            "bull",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn watchlist_rejection_is_a_side_effect_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/watchlist"))
        .respond_with(ResponseTemplate::new(500).set_body_string("group locked"))
        .mount(&server)
        .await;

    let registrar = RestWatchlistRegistrar::new(&format!("{}/watchlist", server.uri())).unwrap();
    let err = registrar
        .register(&["000001".to_string()], EntityType::Stock, "tech")
        .await
        .unwrap_err();
    match err {
        ScreenerError::SideEffectFailure { group, reason } => {
            assert_eq!(group, "tech");
            assert!(reason.contains("group locked"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn webhook_posts_notification() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(body_json(json!({
            "recipient": OPERATOR,
            "subject": "2024-03-01 bull and up result",
            "body": "no targets"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(&format!("{}/notify", server.uri())).unwrap();
    notifier
        .send(OPERATOR, "2024-03-01 bull and up result", "no targets")
        .await
        .unwrap();
}

#[tokio::test]
async fn webhook_failure_is_a_notification_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(&format!("{}/notify", server.uri())).unwrap();
    let err = notifier
        .send(OPERATOR, "bull failed after 10 attempts", "bull error")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScreenerError::NotificationFailure { ref recipient, .. } if recipient == OPERATOR
    ));
}
