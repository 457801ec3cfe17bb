//! CORS middleware with preflight short-circuiting.
//!
//! The header set is fixed rather than negotiated: every response carries
//! the same three CORS headers, and an `OPTIONS` request is answered with
//! 200 immediately - the inner service (rate limiting included) never runs
//! for preflights, so browsers negotiating CORS cannot burn a client's
//! request budget.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    HeaderValue,
};
use axum::http::{Method, Request, Response, StatusCode};
use tower::{Layer, Service};

static ALLOW_ORIGIN: HeaderValue = HeaderValue::from_static("*");
static ALLOW_METHODS: HeaderValue = HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS");
static ALLOW_HEADERS: HeaderValue = HeaderValue::from_static("Content-Type, Authorization");

/// Apply the fixed CORS header set to a response.
fn apply_cors_headers(response: &mut Response<Body>) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN.clone());
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS.clone());
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS.clone());
}

/// CORS layer for the Tower middleware stack.
#[derive(Clone, Default)]
pub struct CorsLayer;

impl CorsLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for CorsLayer {
    type Service = CorsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorsService { inner }
    }
}

/// CORS service wrapper.
#[derive(Clone)]
pub struct CorsService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for CorsService<S>
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
        // Preflight: answer directly, nothing downstream runs
        if req.method() == Method::OPTIONS {
            return Box::pin(async {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::OK;
                apply_cors_headers(&mut response);
                Ok(response)
            });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut response = inner.call(req).await?;
            apply_cors_headers(&mut response);
            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tower::ServiceExt;

    fn counting_inner(
        calls: Arc<AtomicUsize>,
    ) -> impl Service<
        Request<Body>,
        Response = Response<Body>,
        Error = Infallible,
        Future = std::future::Ready<Result<Response<Body>, Infallible>>,
    > + Clone {
        tower::service_fn(move |_req: Request<Body>| {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok::<_, Infallible>(Response::new(Body::empty())))
        })
    }

    fn assert_cors_headers(response: &Response<Body>) {
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            "Content-Type, Authorization"
        );
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let svc = CorsLayer::new().layer(counting_inner(calls.clone()));

        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/anything")
            .body(Body::empty())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors_headers(&response);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "inner must not run for preflight");
    }

    #[tokio::test]
    async fn test_normal_request_forwards_and_gets_headers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let svc = CorsLayer::new().layer(counting_inner(calls.clone()));

        let req = Request::builder()
            .method(Method::GET)
            .uri("/data")
            .body(Body::empty())
            .unwrap();
        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors_headers(&response);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
