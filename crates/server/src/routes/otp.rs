use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use ttlgate_common::TtlGateError;

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub otp: String,
}

fn invalid_request() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid request" })),
    )
}

/// POST /send-otp
///
/// Issues a fresh code for the phone number and hands it to the configured
/// delivery channel.
pub async fn send_otp(
    State(state): State<SharedState>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Ok(Json(request)) = payload else {
        return invalid_request();
    };
    if request.phone.is_empty() {
        return invalid_request();
    }

    match state.otp.send(&request.phone) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "otp has been sent" })),
        ),
        Err(TtlGateError::InvalidInput(_)) => invalid_request(),
        Err(e) => {
            tracing::error!(error = %e, "error while sending the otp");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to send otp" })),
            )
        }
    }
}

/// POST /verify-otp
///
/// Checks the submitted code against the one issued for the phone number.
pub async fn verify_otp(
    State(state): State<SharedState>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Ok(Json(request)) = payload else {
        return invalid_request();
    };

    if !state.otp.check(&request.phone, &request.otp) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid otp" })),
        );
    }

    tracing::info!(phone = %request.phone, "otp verified");

    (
        StatusCode::OK,
        Json(json!({ "message": "otp verified successfully" })),
    )
}
