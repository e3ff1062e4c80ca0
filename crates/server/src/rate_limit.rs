#![allow(unreachable_pub, clippy::redundant_pub_crate)]
//! Fixed-window request throttling for the API service.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::{Duration, Instant},
};

use api_types::ErrorResponse;
use axum::{
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

/// Shared fixed-window counter. The window starts on the first request after
/// expiry, not on a timer tick.
#[derive(Clone, Debug)]
struct Window {
    state: Arc<Mutex<WindowState>>,
    capacity: u64,
    period: Duration,
}

#[derive(Debug)]
struct WindowState {
    count: u64,
    reset_at: Instant,
}

impl Window {
    fn new(capacity: u64, period: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(WindowState {
                count: 0,
                reset_at: Instant::now() + period,
            })),
            capacity,
            period,
        }
    }

    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().expect("lock poisoned");
        let now = Instant::now();
        if now >= state.reset_at {
            state.reset_at = now + self.period;
            state.count = 1;
            true
        } else if state.count < self.capacity {
            state.count += 1;
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug)]
pub(super) struct RateLimitLayer {
    window: Window,
}

impl RateLimitLayer {
    pub fn new(max: u64, period: Duration) -> Self {
        Self { window: Window::new(max, period) }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit { inner, window: self.window.clone() }
    }
}

#[derive(Clone, Debug)]
pub(super) struct RateLimit<S> {
    inner: S,
    window: Window,
}

impl<S, ReqBody> Service<Request<ReqBody>> for RateLimit<S>
where
    S: Service<Request<ReqBody>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if self.window.try_acquire() {
            Box::pin(self.inner.call(req))
        } else {
            let retry_secs = self.window.period.as_secs();
            let error_body = ErrorResponse::new(
                "rate-limit",
                "Too Many Requests",
                StatusCode::TOO_MANY_REQUESTS,
                format!("Rate limit exceeded. Retry after {retry_secs} seconds"),
            );
            let mut resp = axum::Json(error_body).into_response();
            *resp.status_mut() = StatusCode::TOO_MANY_REQUESTS;
            resp.headers_mut().insert(
                axum::http::header::RETRY_AFTER,
                axum::http::HeaderValue::from_str(&retry_secs.to_string()).unwrap(),
            );
            Box::pin(std::future::ready(Ok(resp)))
        }
    }
}
