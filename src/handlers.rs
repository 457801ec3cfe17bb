//! HTTP handlers served by the binary.
//!
//! The pipeline is the product; the handlers here are the minimal surface
//! needed to run and probe it.

use axum::Json;
use serde_json::{Value, json};

use crate::error::AppResult;

/// Liveness probe. Goes through the full middleware stack, so a 200 here
/// also confirms the pipeline itself is healthy.
pub async fn health_check() -> AppResult<Json<Value>> {
    Ok(Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
