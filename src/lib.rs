//! # Gantry
//!
//! An HTTP request-processing pipeline for Axum services, applying
//! cross-cutting concerns to every inbound request before it reaches
//! application logic:
//!
//! - **CORS** with preflight short-circuiting
//! - **Request logging** with per-request correlation ids
//! - **Per-client rate limiting** over a rolling sliding window
//! - **Error classification** turning handler failures into safe JSON bodies
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pipeline (CORS → Request Log → Rate Limit → Error Boundary)│
//! ├─────────────────────────────────────────────────────────────┤
//! │  Application handlers (Result<_, AppError>)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use axum::{Router, routing::get};
//! use gantry::{Config, SlidingWindow, apply_pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let limiter = Arc::new(SlidingWindow::new(
//!         config.rate_limit_max_requests,
//!         config.rate_limit_window,
//!     )?);
//!
//!     let app = apply_pipeline(
//!         Router::new().route("/", get(|| async { "hello" })),
//!         Some(limiter.clone()),
//!     );
//!     // spawn_sweeper requires a running Tokio runtime
//!     let _sweeper = limiter.clone().spawn_sweeper(config.rate_limit_sweep_interval);
//!
//!     let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! Handlers participate in error classification by returning
//! [`AppResult`]: every [`AppError`] variant maps to a fixed status code and
//! a client-safe message, while the full failure is logged server-side with
//! the request's correlation id.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use middleware::{RateLimitError, SlidingWindow};
pub use routes::{apply_pipeline, build_router};
