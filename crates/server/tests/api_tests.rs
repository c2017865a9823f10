use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use ttlgate_common::{TtlGateError, TtlGateResult};
use ttlgate_otp::{CodeDelivery, CodeGate};
use ttlgate_rate_limit::FixedWindowLimiter;
use ttlgate_server::{build_router, AppState};
use ttlgate_store::{CounterStore, ExpiringStore};

/// Delivery channel that remembers the last code per phone.
#[derive(Default)]
struct Inbox {
    codes: Mutex<HashMap<String, String>>,
}

impl Inbox {
    fn code_for(&self, phone: &str) -> Option<String> {
        self.codes.lock().unwrap().get(phone).cloned()
    }
}

impl CodeDelivery for Inbox {
    fn deliver(&self, identity: &str, code: &str) -> TtlGateResult<()> {
        self.codes
            .lock()
            .unwrap()
            .insert(identity.to_string(), code.to_string());
        Ok(())
    }
}

struct Offline;

impl CodeDelivery for Offline {
    fn deliver(&self, _identity: &str, _code: &str) -> TtlGateResult<()> {
        Err(TtlGateError::Delivery("gateway offline".into()))
    }
}

fn app_with(delivery: Arc<dyn CodeDelivery>, limiter: Option<Arc<FixedWindowLimiter>>) -> (Router, Arc<AppState>) {
    let codes = ExpiringStore::new();
    let gate = CodeGate::new(codes.clone(), delivery, 6, Duration::from_secs(120)).unwrap();
    let state = Arc::new(AppState::new(
        Arc::new(gate),
        codes,
        CounterStore::new(),
        limiter,
    ));
    (build_router(Arc::clone(&state), false), state)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

async fn post_raw(app: &Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn send_then_verify() {
    let inbox = Arc::new(Inbox::default());
    let (app, _) = app_with(inbox.clone(), None);

    let (status, body) = post_json(&app, "/send-otp", json!({"phone": "+15550100"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "otp has been sent"}));

    let code = inbox.code_for("+15550100").expect("code delivered");
    assert_eq!(code.len(), 6);

    let (status, body) = post_json(
        &app,
        "/verify-otp",
        json!({"phone": "+15550100", "otp": code}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "otp verified successfully"}));

    // Codes are single-use.
    let (status, body) = post_json(
        &app,
        "/verify-otp",
        json!({"phone": "+15550100", "otp": code}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid otp"}));
}

#[tokio::test]
async fn wrong_code_is_rejected() {
    let inbox = Arc::new(Inbox::default());
    let (app, _) = app_with(inbox.clone(), None);

    post_json(&app, "/send-otp", json!({"phone": "+15550101"})).await;
    let code = inbox.code_for("+15550101").unwrap();
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let (status, body) =
        post_json(&app, "/verify-otp", json!({"phone": "+15550101", "otp": wrong})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid otp"}));
}

#[tokio::test]
async fn verify_without_send_is_rejected() {
    let (app, _) = app_with(Arc::new(Inbox::default()), None);

    let (status, body) =
        post_json(&app, "/verify-otp", json!({"phone": "+15550102", "otp": "123456"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid otp"}));
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let (app, _) = app_with(Arc::new(Inbox::default()), None);

    let (status, body) = post_raw(&app, "/send-otp", "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid request"}));

    let (status, _) = post_json(&app, "/send-otp", json!({"number": "+15550103"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(&app, "/send-otp", json!({"phone": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(&app, "/verify-otp", json!({"phone": "+15550103"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid request"}));
}

#[tokio::test]
async fn delivery_failure_is_server_error() {
    let (app, state) = app_with(Arc::new(Offline), None);

    let (status, body) = post_json(&app, "/send-otp", json!({"phone": "+15550104"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "failed to send otp"}));
    assert!(state.codes.is_empty());
}

#[tokio::test]
async fn rate_limit_gates_otp_routes() {
    let counters = CounterStore::new();
    let limiter = Arc::new(
        FixedWindowLimiter::new("otp", 2, Duration::from_secs(60), Arc::new(counters)).unwrap(),
    );
    let (app, _) = app_with(Arc::new(Inbox::default()), Some(limiter));

    for _ in 0..2 {
        let (status, _) = post_json(&app, "/send-otp", json!({"phone": "+15550105"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = post_json(&app, "/send-otp", json!({"phone": "+15550105"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({}));

    let (status, _) =
        post_json(&app, "/verify-otp", json!({"phone": "+15550105", "otp": "123456"})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Health is outside the gate.
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_and_stats() {
    let inbox = Arc::new(Inbox::default());
    let (app, _) = app_with(inbox, None);
    post_json(&app, "/send-otp", json!({"phone": "+15550106"})).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health["status"], "ok");

    let response = app
        .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let stats: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["codes_resident"], 1);
    assert_eq!(stats["counters_resident"], 0);
    assert!(stats["rate_limit"].is_null());
}
