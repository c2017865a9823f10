pub mod routes;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use ttlgate_rate_limit::SharedLimiter;

pub use state::{AppState, SharedState};

/// Build the Axum router with the verification routes and the operator API.
///
/// When the state carries a limiter, `/send-otp` and `/verify-otp` sit behind
/// the rate-limit gate. The health and stats routes are never limited.
pub fn build_router(state: SharedState, cors: bool) -> Router {
    let mut otp_router = Router::new()
        .route("/send-otp", post(routes::otp::send_otp))
        .route("/verify-otp", post(routes::otp::verify_otp));

    if let Some(limiter) = &state.limiter {
        let limiter: SharedLimiter = Arc::clone(limiter) as SharedLimiter;
        otp_router = otp_router.layer(from_fn_with_state(limiter, ttlgate_rate_limit::enforce));
    }

    let router = Router::new()
        // Health check
        .route("/api/health", get(routes::health::health_check))
        // Store and limiter statistics
        .route("/api/stats", get(routes::stats::get_stats))
        .merge(otp_router)
        .with_state(state);

    if cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Serve the router on `listen_addr` until `shutdown` resolves.
///
/// In-flight requests are drained before this returns. Background tasks
/// owned by the state are left running; stop them with
/// [`AppState::shutdown`].
pub async fn run_server<F>(
    state: SharedState,
    listen_addr: &str,
    cors: bool,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, cors);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("ttlgate listening on {}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
