//! Error boundary middleware wrapping the downstream handler.
//!
//! Handlers return `Result<_, AppError>`; `AppError`'s `IntoResponse` stashes
//! the original error in the response extensions. This stage - the innermost
//! in the chain, wrapping only the downstream call - picks it up, logs the
//! full failure once at error severity, and rewrites the response body with
//! the request's correlation id as `traceId`. Clients only ever see the
//! classified status, type name, and safe message.
//!
//! An error that somehow reaches this stage unclassified does not exist:
//! every `AppError` variant classifies, with `Internal` as the 500 catch-all,
//! so no failure escapes the pipeline unshaped.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::error;

use super::request_log::CorrelationIdExt;
use crate::error::{AppError, ErrorBody};

/// Error boundary layer for the Tower middleware stack.
#[derive(Clone, Default)]
pub struct ErrorBoundaryLayer;

impl ErrorBoundaryLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ErrorBoundaryLayer {
    type Service = ErrorBoundaryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorBoundaryService { inner }
    }
}

/// Error boundary service wrapper.
#[derive(Clone)]
pub struct ErrorBoundaryService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for ErrorBoundaryService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // The logging middleware sits outside this stage, so the id exists
        // by the time a request gets here
        let trace_id = req.correlation_id().map(str::to_string);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(req).await?;

            let Some(err) = response.extensions_mut().remove::<AppError>() else {
                return Ok(response);
            };

            let (status, error_type, message) = err.classify();

            // The one place the full failure detail is recorded
            error!(
                error = %err,
                error_type,
                trace_id = trace_id.as_deref().unwrap_or("-"),
                "Request failed"
            );

            let body = ErrorBody::new(error_type, &message, trace_id);
            Ok((status, axum::Json(body)).into_response())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::middleware::request_log::CorrelationId;

    fn failing_inner(
        err: AppError,
    ) -> impl Service<
        Request<Body>,
        Response = Response<Body>,
        Error = Infallible,
        Future = std::future::Ready<Result<Response<Body>, Infallible>>,
    > + Clone {
        tower::service_fn(move |_req: Request<Body>| {
            std::future::ready(Ok::<_, Infallible>(err.clone().into_response()))
        })
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_trace_id_injected_into_error_body() {
        let svc = ErrorBoundaryLayer::new().layer(failing_inner(AppError::Unauthorized(
            "no session".into(),
        )));

        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(CorrelationId("trace-42".into()));

        let response = svc.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["error"]["traceId"], "trace-42");
        assert_eq!(json["error"]["type"], "UnauthorizedAccess");
        assert_eq!(json["error"]["message"], "Unauthorized access");
    }

    #[tokio::test]
    async fn test_internal_detail_stays_out_of_body() {
        let svc = ErrorBoundaryLayer::new().layer(failing_inner(AppError::Internal(
            "sqlstate 08006 host db-primary".into(),
        )));

        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut().insert(CorrelationId("t".into()));

        let response = svc.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal server error occurred");
        assert!(!json.to_string().contains("db-primary"));
    }

    #[tokio::test]
    async fn test_success_passes_through_untouched() {
        let svc = ErrorBoundaryLayer::new().layer(tower::service_fn(
            |_req: Request<Body>| {
                std::future::ready(Ok::<_, Infallible>(
                    Response::builder()
                        .status(StatusCode::CREATED)
                        .body(Body::from("made"))
                        .unwrap(),
                ))
            },
        ));

        let response = svc
            .oneshot(Request::builder().body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
