//! Per-client rate limiting middleware using a sliding window.
//!
//! # Algorithm
//!
//! Each client identity maps to an ordered list of admission timestamps. On
//! every request the window is pruned of timestamps older than the configured
//! duration, then the request is admitted only if fewer than the limit
//! remain. Because pruning is relative to "now" on every call, the window is
//! fully rolling: a rejected client regains capacity continuously as old
//! timestamps age out, not at fixed bucket boundaries.
//!
//! # Concurrency
//!
//! The client map is the only shared mutable state in the pipeline. The
//! whole lookup-prune-check-append sequence runs under a single mutex so two
//! concurrent requests from the same client can never both pass the length
//! check before either records its timestamp. The critical section is
//! in-memory list work only; the rejection log fires after the lock is
//! released.
//!
//! # Configuration
//!
//! - `RATE_LIMIT_MAX_REQUESTS`: Requests per client per window (default: 10)
//! - `RATE_LIMIT_WINDOW_SECS`: Window duration (default: 60)
//!
//! State is in-process and lost on restart; distributed enforcement is out
//! of scope.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::client_id::identify_client;
use crate::error::ErrorBody;

/// Error type for rate limit layer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// The per-window request limit cannot be zero.
    ZeroLimit,
    /// The window duration cannot be zero.
    ZeroWindow,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroLimit => {
                write!(
                    f,
                    "request limit must be greater than 0; skip the layer to disable limiting"
                )
            }
            RateLimitError::ZeroWindow => {
                write!(f, "window duration must be greater than 0")
            }
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Sliding-window admission state, shared across all concurrent requests.
///
/// Keys are opaque client identities; values are admission timestamps,
/// oldest first. Entries are created on a client's first request and pruned
/// per-request; fully idle clients are removed by [`SlidingWindow::sweep`].
pub struct SlidingWindow {
    windows: Mutex<HashMap<String, Vec<Instant>>>,
    window: Duration,
    limit: usize,
}

impl SlidingWindow {
    /// Create the shared admission state.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitError` if `limit` or `window` is zero. Disabling is
    /// a configuration decision, not a degenerate limiter.
    pub fn new(limit: u32, window: Duration) -> Result<Self, RateLimitError> {
        if limit == 0 {
            return Err(RateLimitError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(RateLimitError::ZeroWindow);
        }

        Ok(Self {
            windows: Mutex::new(HashMap::new()),
            window,
            limit: limit as usize,
        })
    }

    /// Configured per-window request limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Configured window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether to admit a request from `client_id` at `now`.
    ///
    /// Runs lookup-or-create, prune, length check, and append as one
    /// critical section. A rejected request is not recorded - only admitted
    /// timestamps occupy the window.
    pub fn admit(&self, client_id: &str, now: Instant) -> bool {
        let mut windows = self.lock_windows();
        let timestamps = windows.entry(client_id.to_owned()).or_default();

        // Drop timestamps that have aged out of the rolling window
        timestamps.retain(|t| now.duration_since(*t) <= self.window);

        if timestamps.len() >= self.limit {
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Remove clients whose windows hold no timestamps newer than the window
    /// duration.
    ///
    /// Per-request pruning only trims one client's list; without this sweep a
    /// long-lived process keeps one empty entry per distinct historical
    /// client forever.
    pub fn sweep(&self, now: Instant) {
        let mut windows = self.lock_windows();
        let before = windows.len();
        windows.retain(|_, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) <= self.window);
            !timestamps.is_empty()
        });
        let removed = before - windows.len();
        drop(windows);

        if removed > 0 {
            debug!(removed, "Swept idle client windows");
        }
    }

    /// Number of tracked clients, idle or not. Observability and tests only.
    pub fn client_count(&self) -> usize {
        self.lock_windows().len()
    }

    /// Spawn a background task sweeping idle clients at `interval`.
    ///
    /// The task runs until the handle is aborted or the runtime shuts down.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let state = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                state.sweep(Instant::now());
            }
        })
    }

    /// Lock the client map, recovering from poisoning.
    ///
    /// The critical sections never panic (pure list and map operations), so a
    /// poisoned lock can only come from a panicking test; the data itself is
    /// still consistent.
    fn lock_windows(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SlidingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidingWindow")
            .field("window", &self.window)
            .field("limit", &self.limit)
            .field("clients", &self.client_count())
            .finish()
    }
}

/// Rate limiting layer for the Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(SlidingWindow::new(10, Duration::from_secs(60))?);
/// let app = Router::new()
///     .route("/api", get(handler))
///     .layer(RateLimitLayer::new(limiter));
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    state: Arc<SlidingWindow>,
}

impl RateLimitLayer {
    /// Create a layer over shared admission state.
    ///
    /// Taking the state by `Arc` lets the caller keep a handle for the
    /// background sweeper.
    pub fn new(state: Arc<SlidingWindow>) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    state: Arc<SlidingWindow>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
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
        let state = self.state.clone();
        let mut inner = self.inner.clone();

        // Resolve the identity before the request is moved
        let client_id = identify_client(&req).into_owned();

        Box::pin(async move {
            if state.admit(&client_id, Instant::now()) {
                return inner.call(req).await;
            }

            warn!(
                client_id = %client_id,
                path = %req.uri().path(),
                limit = state.limit(),
                "Rate limit exceeded"
            );

            let body = ErrorBody::new(
                "RateLimitExceeded",
                "Rate limit exceeded. Please try again later.",
                // Known asymmetry with classified errors: no traceId here
                None,
            );
            Ok((StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response())
        })
    }
}
