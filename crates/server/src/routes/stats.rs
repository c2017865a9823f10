use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /api/stats
///
/// Reports resident entry counts for both stores and, when rate limiting is
/// enabled, the units left in the current window.
pub async fn get_stats(State(state): State<SharedState>) -> Json<Value> {
    let rate_limit = state.limiter.as_ref().map(|limiter| {
        json!({
            "scope": limiter.scope(),
            "capacity": limiter.capacity(),
            "window_secs": limiter.window().as_secs(),
            "remaining": limiter.remaining().ok()
        })
    });

    Json(json!({
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "codes_resident": state.codes.len(),
        "counters_resident": state.counters.len(),
        "rate_limit": rate_limit
    }))
}
