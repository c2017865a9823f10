//! Rate limiting for ttlgate.
//!
//! This crate provides a fixed-window limiter behind the [`RateLimiter`]
//! trait, plus an axum middleware gate that rejects requests with
//! `429 Too Many Requests` once the limiter denies them.
//!
//! - **Fixed window** -- a counter held in a shared
//!   [`CounterStore`](ttlgate_store::CounterStore) starts at `capacity`, each
//!   admitted request takes one unit, and a background task resets it to
//!   `capacity` on a fixed clock tick. This is burst-per-window limiting, not
//!   a smoothly refilling token bucket.
//!
//! Admission uses an atomic decrement-if-positive, so concurrent callers can
//! never be admitted more than `capacity` times per window. Any failure from
//! the counter store denies the request.

pub mod fixed_window;
pub mod middleware;

use std::sync::Arc;

pub use fixed_window::FixedWindowLimiter;
pub use middleware::enforce;

/// Admission gate consumed by request handlers and middleware.
pub trait RateLimiter: Send + Sync {
    /// Returns `true` if one more request may proceed in the current window.
    fn allow(&self) -> bool;

    /// Like [`allow`](RateLimiter::allow), scoped to a single identity.
    fn allow_for(&self, identity: &str) -> bool;
}

/// Limiter handle shared with middleware and handlers.
pub type SharedLimiter = Arc<dyn RateLimiter>;
