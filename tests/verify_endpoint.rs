//! Tests for the GET /verify endpoint and the client that calls it.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Path,
    http::{Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::*;

use qrstudio::handlers::{app, AppState};
use qrstudio::payments::{CheckoutLookup, DevCheckouts, StripeClient};
use qrstudio::verify::{verify_reference, HttpVerifier};

fn dev_app() -> (Router, Arc<DevCheckouts>) {
    let dev = Arc::new(DevCheckouts::new());
    let state = AppState {
        checkouts: Some(dev.clone() as Arc<dyn CheckoutLookup>),
    };
    (app(state, Some(dev.clone())), dev)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Serves `router` on an ephemeral port and returns its base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// ============ Endpoint ============

#[tokio::test]
async fn test_health() {
    let (app, _) = dev_app();
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_missing_session_id_is_bad_request() {
    for uri in ["/verify", "/verify?session_id="] {
        let (app, _) = dev_app();
        let (status, json) = get_json(app, uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{} should be rejected", uri);
        assert_eq!(json["error"], "Bad request");
    }
}

#[tokio::test]
async fn test_malformed_session_id_is_bad_request() {
    let (app, _) = dev_app();
    let (status, _) = get_json(app, "/verify?session_id=pi_123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_session_is_not_verified() {
    let (app, _) = dev_app();
    let (status, json) = get_json(app, "/verify?session_id=cs_test_unknown").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "verified": false }));
}

#[tokio::test]
async fn test_paid_session_is_verified() {
    let (app, dev) = dev_app();
    dev.mark_paid("cs_test_paid").unwrap();

    let (status, json) = get_json(app, "/verify?session_id=cs_test_paid").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "verified": true }));
}

#[tokio::test]
async fn test_dev_route_marks_session_paid() {
    let (app, dev) = dev_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/dev/sessions/cs_test_dev/paid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(matches!(
        dev.payment_status("cs_test_dev").await.unwrap(),
        qrstudio::payments::PaymentStatus::Paid
    ));
}

#[tokio::test]
async fn test_dev_route_absent_without_dev_mode() {
    let state = AppState {
        checkouts: Some(Arc::new(DevCheckouts::new())),
    };
    let response = app(state, None)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/dev/sessions/cs_test_dev/paid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unconfigured_provider_is_server_error() {
    let app = app(AppState { checkouts: None }, None);
    let (status, json) = get_json(app, "/verify?session_id=cs_test_1").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json.get("details").is_none(), "internal details must not leak");
}

// ============ Stripe lookup against a mock API ============

async fn mock_stripe() -> String {
    let router = Router::new().route(
        "/v1/checkout/sessions/{id}",
        get(|Path(id): Path<String>| async move {
            match id.as_str() {
                "cs_test_paid" => Ok(Json(json!({
                    "id": id.clone(),
                    "object": "checkout.session",
                    "mode": "payment",
                    "status": "complete",
                    "payment_status": "paid",
                    "customer_email": "buyer@example.com"
                }))),
                "cs_test_open" => Ok(Json(json!({
                    "id": id.clone(),
                    "status": "open",
                    "payment_status": "unpaid"
                }))),
                _ => Err(StatusCode::NOT_FOUND),
            }
        }),
    );
    spawn(router).await
}

#[tokio::test]
async fn test_stripe_lookup_statuses() {
    use qrstudio::payments::PaymentStatus;

    let base = mock_stripe().await;
    let stripe = StripeClient::with_api_base("sk_test_123", &base);

    assert_eq!(stripe.payment_status("cs_test_paid").await.unwrap(), PaymentStatus::Paid);
    assert_eq!(stripe.payment_status("cs_test_open").await.unwrap(), PaymentStatus::Unpaid);
    assert_eq!(stripe.payment_status("cs_test_gone").await.unwrap(), PaymentStatus::NotFound);
}

#[tokio::test]
async fn test_verify_endpoint_backed_by_stripe() {
    let stripe_base = mock_stripe().await;
    let state = AppState {
        checkouts: Some(Arc::new(StripeClient::with_api_base("sk_test_123", &stripe_base))),
    };

    let (status, json) = get_json(app(state.clone(), None), "/verify?session_id=cs_test_paid").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["verified"], true);

    let (_, json) = get_json(app(state, None), "/verify?session_id=cs_test_open").await;
    assert_eq!(json["verified"], false);
}

// ============ Client round trip ============

#[tokio::test]
async fn test_http_verifier_against_live_endpoint() {
    let (router, dev) = dev_app();
    dev.mark_paid("cs_test_live").unwrap();
    let base = spawn(router).await;

    let verifier = HttpVerifier::new(&format!("{}/verify", base)).unwrap();

    let proof = verify_reference(&verifier, Some("cs_test_live")).await.unwrap();
    assert_eq!(proof.reference(), "cs_test_live");

    let unpaid = verify_reference(&verifier, Some("cs_test_other")).await;
    assert!(matches!(unpaid, Err(AppError::Verification(_))));

    // 400 from the endpoint is a failure, not a panic or a pass
    let malformed = verify_reference(&verifier, Some("not-a-session")).await;
    assert!(matches!(malformed, Err(AppError::Verification(_))));
}

#[tokio::test]
async fn test_http_verifier_unreachable_endpoint() {
    let verifier = HttpVerifier::new("http://127.0.0.1:9/verify").unwrap();
    let result = verify_reference(&verifier, Some("cs_test_1")).await;
    assert!(matches!(result, Err(AppError::Verification(_))));
}

#[tokio::test]
async fn test_studio_activates_through_live_endpoint() {
    let (router, dev) = dev_app();
    dev.mark_paid("cs_test_e2e").unwrap();
    let base = spawn(router).await;

    let storage = test_storage();
    let verifier = Arc::new(HttpVerifier::new(&format!("{}/verify", base)).unwrap());
    let mut studio = Studio::new(
        storage.clone(),
        Box::new(RecordingRenderer::new()),
        verifier,
        test_options(),
    );

    let outcome = studio
        .handle_return(&format!("{}success?session_id=cs_test_e2e", APP_BASE))
        .await
        .unwrap();

    assert_eq!(outcome, ReturnOutcome::Activated { restore: None });
    assert_eq!(storage.get(keys::ENTITLEMENT_GRANTED).as_deref(), Some("true"));
}
