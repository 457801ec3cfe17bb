//! Request logging and correlation id middleware.
//!
//! Every request gets a fresh UUIDv4 correlation id - client-supplied ids
//! are not trusted for correlation. The middleware emits exactly one
//! "started" and one "completed" record per request: the completion record
//! is owned by a drop guard, so every exit path produces it - handler
//! success, a later stage short-circuiting, a classified failure, or the
//! request future being dropped mid-flight when the client goes away.
//!
//! The id is:
//! - inserted into request extensions as [`CorrelationId`] for downstream
//!   stages (the error boundary puts it in error bodies as `traceId`)
//! - returned to the client in the `X-Request-ID` response header

use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Method, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::info;
use uuid::Uuid;

/// Header name for the correlation id on responses.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fallback header value if a generated id ever fails to parse. UUIDs are
/// always valid header values, so this exists to satisfy the infallible path.
static UNKNOWN_REQUEST_ID: HeaderValue = HeaderValue::from_static("unknown");

/// Correlation id assigned to a request, stored in request extensions.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Extension trait for reading the correlation id off a request.
pub trait CorrelationIdExt {
    /// The correlation id assigned by the logging middleware, if any.
    fn correlation_id(&self) -> Option<&str>;
}

impl<B> CorrelationIdExt for Request<B> {
    fn correlation_id(&self) -> Option<&str> {
        self.extensions().get::<CorrelationId>().map(|id| id.as_str())
    }
}

/// Drop guard that owns the completion record for one request.
///
/// Emitting from `Drop` makes the exactly-once guarantee structural: the
/// record fires whether the inner future resolves, errors out, or is dropped
/// before completion. `status` stays unset on abandoned requests, so the
/// field is simply absent from those records.
struct CompletionLog {
    method: Method,
    path: String,
    request_id: String,
    started_at: Instant,
    status: Option<u16>,
}

impl CompletionLog {
    fn finish(mut self, status: StatusCode) {
        self.status = Some(status.as_u16());
    }
}

impl Drop for CompletionLog {
    fn drop(&mut self) {
        info!(
            method = %self.method,
            path = %self.path,
            request_id = %self.request_id,
            status = self.status,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            "Request completed"
        );
    }
}

/// Request logging layer for the Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestLogLayer;

impl RequestLogLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner }
    }
}

/// Request logging service wrapper.
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestLogService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let request_id = Uuid::new_v4().to_string();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        req.extensions_mut()
            .insert(CorrelationId(request_id.clone()));

        let mut inner = self.inner.clone();

        Box::pin(async move {
            info!(
                method = %method,
                path = %path,
                request_id = %request_id,
                "Request started"
            );

            // Both log records live inside the future: a request whose
            // future is never polled logs nothing, one that gets underway
            // logs both, with the completion guaranteed by the guard's Drop
            let completion = CompletionLog {
                method,
                path,
                request_id: request_id.clone(),
                started_at: Instant::now(),
                status: None,
            };

            let mut response = inner.call(req).await?;

            response.headers_mut().insert(
                REQUEST_ID_HEADER,
                request_id
                    .parse()
                    .unwrap_or_else(|_| UNKNOWN_REQUEST_ID.clone()),
            );

            completion.finish(response.status());
            Ok(response)
        })
    }
}
