//! HTTP middleware stages composed into the request pipeline.
//!
//! # Chain Order
//!
//! ```text
//! Request → CORS → Request Log → Rate Limiter → Error Boundary → Handler
//!            ↓          ↓             ↓               ↓
//!         200 for   X-Request-ID  429 Too Many   classified JSON
//!         OPTIONS   + timing logs                error bodies
//! ```
//!
//! The order is deliberate:
//!
//! - CORS answers preflights before any accounting happens
//! - logging brackets everything after it, so rejections and failures still
//!   get accurate timing and a correlation id
//! - rate limiting runs before downstream work but after an id exists, so
//!   429s remain traceable
//! - the error boundary wraps only the downstream call; the other stages are
//!   not expected to fail
//!
//! Each stage is a Tower `Layer`/`Service` pair holding no state beyond what
//! its job requires; the chain itself is just the order they are applied in
//! (see `routes::apply_pipeline`).

pub mod client_id;
pub mod cors;
pub mod error_boundary;
pub mod rate_limit;
pub mod request_log;

pub use client_id::{UNKNOWN_CLIENT, identify_client};
pub use cors::CorsLayer;
pub use error_boundary::ErrorBoundaryLayer;
pub use rate_limit::{RateLimitError, RateLimitLayer, SlidingWindow};
pub use request_log::{CorrelationId, CorrelationIdExt, REQUEST_ID_HEADER, RequestLogLayer};
