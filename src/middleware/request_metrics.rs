//! Request metrics middleware
//!
//! Wraps every response body in a `MeteredBody` that counts the bytes
//! written to the client. The request is recorded into a [`Metrics`] facade
//! once, when that body ends or is dropped, so latency and sent bytes cover
//! streamed responses too. With no facade configured the middleware only
//! forwards the request.
//!
//! ```no_run
//! use axum::{Router, middleware, routing::get};
//! use reqmeter::metrics::{Metrics, NamespaceRegistry};
//! use reqmeter::middleware::record_metrics;
//!
//! # async fn build() -> Result<Router, reqmeter::error::MetricsError> {
//! let registry = NamespaceRegistry::new();
//! let metrics = Metrics::start("default", &registry)?;
//!
//! let app = Router::new()
//!     .route("/ping", get(|| async { "pong" }))
//!     .layer(middleware::from_fn_with_state(Some(metrics), record_metrics));
//! # Ok(app)
//! # }
//! ```

use crate::metrics::Metrics;
use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use http_body::{Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Instant;

/// Middleware that records status, path, method, latency and sizes per request
pub async fn record_metrics(
    State(metrics): State<Option<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(metrics) = metrics else {
        return next.run(request).await;
    };

    let start = Instant::now();
    let method = request.method().as_str().to_owned();

    // Route template keeps label cardinality bounded; raw path only for unmatched requests
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let request_size = request_size(&request);

    let response = next.run(request).await;

    let pending = PendingRecord {
        metrics,
        status: response.status().as_u16(),
        path,
        method,
        request_size,
        start,
    };

    response.map(|body| Body::new(MeteredBody::new(body, pending)))
}

/// Everything known about a request before its response body is written
struct PendingRecord {
    metrics: Metrics,
    status: u16,
    path: String,
    method: String,
    request_size: i64,
    start: Instant,
}

impl PendingRecord {
    fn finish(self, sent_bytes: u64) {
        let duration = self.start.elapsed().as_secs_f64();
        let response_size = i64::try_from(sent_bytes).unwrap_or(i64::MAX);

        tracing::trace!(
            namespace = self.metrics.namespace(),
            status = self.status,
            path = %self.path,
            method = %self.method,
            duration_secs = duration,
            request_size = self.request_size,
            response_size,
            "Request recorded"
        );

        self.metrics.record_request(
            self.status,
            &self.path,
            &self.method,
            duration,
            self.request_size,
            response_size,
        );
    }
}

/// Response body that counts written bytes and records the request when done
///
/// Recording happens at most once: at end of stream, on a body error, or on
/// drop (client went away mid-body). Size hints pass through unchanged.
struct MeteredBody {
    inner: Body,
    sent_bytes: u64,
    pending: Option<PendingRecord>,
}

impl MeteredBody {
    fn new(inner: Body, pending: PendingRecord) -> Self {
        Self {
            inner,
            sent_bytes: 0,
            pending: Some(pending),
        }
    }

    fn finish(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.finish(self.sent_bytes);
        }
    }
}

impl HttpBody for MeteredBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = ready!(Pin::new(&mut this.inner).poll_frame(cx));

        match &polled {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    let len = u64::try_from(data.len()).unwrap_or(u64::MAX);
                    this.sent_bytes = this.sent_bytes.saturating_add(len);
                }
                if this.inner.is_end_stream() {
                    this.finish();
                }
            }
            Some(Err(_)) | None => this.finish(),
        }

        Poll::Ready(polled)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for MeteredBody {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Approximate size of a request as received on the wire
///
/// Sums the URL, protocol, method and host lengths, every header name and
/// value, and the declared content length (0 when absent or invalid). The
/// `host` header is counted once, as the host.
pub fn request_size<B>(request: &Request<B>) -> i64 {
    let uri = request.uri();
    let headers = request.headers();

    let host = headers
        .get(header::HOST)
        .map(|h| h.as_bytes().len())
        .or_else(|| uri.authority().map(|a| a.as_str().len()))
        .unwrap_or(0);

    let header_bytes: usize = headers
        .iter()
        .filter(|(name, _)| **name != header::HOST)
        .map(|(name, value)| name.as_str().len() + value.as_bytes().len())
        .sum();

    let fixed = uri.to_string().len()
        + format!("{:?}", request.version()).len()
        + request.method().as_str().len()
        + host
        + header_bytes;

    let fixed = i64::try_from(fixed).unwrap_or(i64::MAX);
    fixed.saturating_add(content_length(headers).unwrap_or(0).max(0))
}

fn content_length(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
