//! Billing tests: webhook event application and checkout session creation.

use axum::{Json, Router, routing::post};
use serde_json::json;

use ulpan::FixedClock;
use ulpan::auth::UserId;
use ulpan::billing::webhook::{self, SUBSCRIPTION_ACTIVE, SUBSCRIPTION_CANCELLED, WebhookEvent};
use ulpan::billing::{CheckoutClient, CheckoutRequest};
use ulpan::store::{DocPath, DocumentStore, InMemory};

use crate::helpers::spawn_stub_vendor;

fn clock() -> FixedClock {
    FixedClock::default()
}

#[tokio::test]
async fn checkout_completion_activates_the_subscription() {
    let store = InMemory::new();
    let event = WebhookEvent::from_payload(
        br#"{
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_1",
                "customer": "cus_9",
                "subscription": "sub_9",
                "client_reference_id": "u1"
            }}
        }"#,
    )
    .unwrap();

    let updated = webhook::apply_event(&store, &clock(), &event).await.unwrap();
    assert_eq!(updated, Some(UserId::new("u1")));

    let doc = store
        .read(&DocPath::user(&UserId::new("u1")))
        .await
        .unwrap()
        .expect("user document should exist");
    assert_eq!(doc["subscriptionStatus"], SUBSCRIPTION_ACTIVE);
    assert_eq!(doc["customerId"], "cus_9");
    assert_eq!(doc["subscriptionId"], "sub_9");
    assert!(doc.get("subscriptionStartDate").is_some());
    assert!(doc.get("lastUpdated").is_some());
}

#[tokio::test]
async fn subscription_update_passes_the_vendor_status_through() {
    let store = InMemory::new();
    let event = WebhookEvent::from_payload(
        br#"{
            "type": "customer.subscription.updated",
            "data": {"object": {
                "id": "sub_9",
                "status": "past_due",
                "metadata": {"userId": "u1"}
            }}
        }"#,
    )
    .unwrap();

    webhook::apply_event(&store, &clock(), &event).await.unwrap();

    let doc = store
        .read(&DocPath::user(&UserId::new("u1")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["subscriptionStatus"], "past_due");
}

#[tokio::test]
async fn subscription_deletion_marks_the_user_cancelled() {
    let store = InMemory::new();
    let event = WebhookEvent::from_payload(
        br#"{
            "type": "customer.subscription.deleted",
            "data": {"object": {
                "id": "sub_9",
                "metadata": {"userId": "u1"}
            }}
        }"#,
    )
    .unwrap();

    webhook::apply_event(&store, &clock(), &event).await.unwrap();

    let doc = store
        .read(&DocPath::user(&UserId::new("u1")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["subscriptionStatus"], SUBSCRIPTION_CANCELLED);
}

#[tokio::test]
async fn events_without_a_user_are_acknowledged_and_skipped() {
    let store = InMemory::new();
    let event = WebhookEvent::from_payload(
        br#"{"type": "customer.subscription.deleted", "data": {"object": {"id": "sub_9"}}}"#,
    )
    .unwrap();

    let updated = webhook::apply_event(&store, &clock(), &event).await.unwrap();

    assert_eq!(updated, None);
    assert!(store.is_empty());
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged() {
    let store = InMemory::new();
    let event = WebhookEvent::from_payload(
        br#"{"type": "invoice.payment_succeeded", "data": {"object": {"id": "in_1"}}}"#,
    )
    .unwrap();

    let updated = webhook::apply_event(&store, &clock(), &event).await.unwrap();
    assert_eq!(updated, None);
    assert!(store.is_empty());
}

#[tokio::test]
async fn checkout_requires_price_and_user() {
    let client = CheckoutClient::new("http://127.0.0.1:1", "sk_test", "http://app.test");

    let err = client
        .create_session(&CheckoutRequest {
            price_id: String::new(),
            user_id: "u1".to_string(),
            email: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_validation_error());

    let err = client
        .create_session(&CheckoutRequest {
            price_id: "price_1".to_string(),
            user_id: String::new(),
            email: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn checkout_session_is_created_at_the_vendor() {
    let router = Router::new().route(
        "/v1/checkout/sessions",
        post(|| async {
            Json(json!({"id": "cs_123", "url": "https://pay.example/cs_123"}))
        }),
    );
    let origin = spawn_stub_vendor(router).await;
    let client = CheckoutClient::new(&origin, "sk_test", "http://app.test");

    let session = client
        .create_session(&CheckoutRequest {
            price_id: "price_1".to_string(),
            user_id: "u1".to_string(),
            email: Some("rivka@example.com".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(session.id, "cs_123");
    assert_eq!(session.url, "https://pay.example/cs_123");
}

#[tokio::test]
async fn checkout_surfaces_the_vendor_message_on_failure() {
    let router = Router::new().route(
        "/v1/checkout/sessions",
        post(|| async {
            (
                axum::http::StatusCode::PAYMENT_REQUIRED,
                Json(json!({"error": {"message": "Your card was declined."}})),
            )
        }),
    );
    let origin = spawn_stub_vendor(router).await;
    let client = CheckoutClient::new(&origin, "sk_test", "http://app.test");

    let err = client
        .create_session(&CheckoutRequest {
            price_id: "price_1".to_string(),
            user_id: "u1".to_string(),
            email: None,
        })
        .await
        .unwrap_err();

    assert!(err.is_vendor_error());
    assert!(err.to_string().contains("Your card was declined."));
}
