use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::SharedLimiter;

/// Axum middleware that admits a request only if the limiter allows it.
///
/// Denied requests get `429 Too Many Requests` with an empty JSON object as
/// the body. Install with
/// `axum::middleware::from_fn_with_state(limiter, enforce)`.
pub async fn enforce(State(limiter): State<SharedLimiter>, request: Request, next: Next) -> Response {
    if !limiter.allow() {
        tracing::debug!(
            method = %request.method(),
            uri = %request.uri(),
            "request rejected by rate limiter"
        );
        return (StatusCode::TOO_MANY_REQUESTS, Json(serde_json::json!({}))).into_response();
    }

    next.run(request).await
}
