//! Router construction and ordered middleware application.
//!
//! # Middleware Stack (request order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │      CORS        │ ← 200 short-circuit for OPTIONS
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Request Log    │ ← correlation id, start/completion records
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← 429 if the client's window is full
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Error Boundary  │ ← classifies downstream failures
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    CorsLayer, ErrorBoundaryLayer, RateLimitError, RateLimitLayer, RequestLogLayer, SlidingWindow,
};

/// Wrap an application router with the full middleware pipeline.
///
/// Axum runs the most recently added layer first, so the layers are applied
/// innermost to outermost: error boundary, rate limiting, request logging,
/// CORS.
///
/// The rate limiter state is passed in by the caller so the same handle can
/// drive the background sweeper. Passing `None` (limit configured to 0)
/// skips the rate-limiting stage entirely.
pub fn apply_pipeline(router: Router, limiter: Option<Arc<SlidingWindow>>) -> Router {
    let mut router = router.layer(ErrorBoundaryLayer::new());

    if let Some(limiter) = limiter {
        info!(
            limit = limiter.limit(),
            window_secs = limiter.window().as_secs(),
            "Rate limiting enabled"
        );
        router = router.layer(RateLimitLayer::new(limiter));
    } else {
        info!("Rate limiting disabled (RATE_LIMIT_MAX_REQUESTS=0)");
    }

    router.layer(RequestLogLayer::new()).layer(CorsLayer::new())
}

/// Build the application router for the binary: the health route plus the
/// full pipeline.
pub fn build_router(config: &Config) -> Result<(Router, Option<Arc<SlidingWindow>>), RateLimitError>
{
    let limiter = if config.rate_limiting_enabled() {
        Some(Arc::new(SlidingWindow::new(
            config.rate_limit_max_requests,
            config.rate_limit_window,
        )?))
    } else {
        None
    };

    let router = Router::new().route("/health", get(handlers::health_check));
    let router = apply_pipeline(router, limiter.clone());

    Ok((router, limiter))
}
