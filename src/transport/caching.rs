//! The caching round tripper.
//!
//! # Responsibilities
//! - Serve GET/HEAD from the cache store when an entry exists
//! - Forward everything else (and misses) to the upstream
//! - Retry a failed cacheable request once after a fixed delay
//! - Buffer the upstream body and hand the same bytes to the client and the cache
//! - Queue successful cacheable responses for write-behind
//!
//! # Request States
//! ```text
//! START ─(GET/HEAD)→ CHECK_CACHE ─hit→ RETURN_CACHED
//!   │                     └─miss / lookup error─┐
//!   └─(other)──────────────────────────────→ FORWARD ─fail, cacheable→ RETRY_ONCE
//!                                                │                        │
//!                                                ok                      ok / fail→ FAIL
//!                                                ▼                        ▼
//!                                            READ_BODY ─2xx, cacheable→ enqueue write
//!                                                ▼
//!                                             RETURN
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, Response, StatusCode};
use bytes::Bytes;

use crate::cache::{CacheRequest, CacheStore};
use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::resilience::{is_retryable, RetryPolicy};
use crate::transport::dump;
use crate::transport::upstream::{Upstream, UpstreamError};
use crate::transport::write_behind::{WriteBehind, WriteJob};

/// Error type for a proxied round trip.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("unable to read upstream body: {0}")]
    ReadBody(#[source] axum::Error),
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round tripper that consults a cache store before the upstream.
pub struct CachingTransport<S, U> {
    store: Arc<S>,
    upstream: U,
    writer: WriteBehind,
    retry: RetryPolicy,
}

impl<S: CacheStore, U: Upstream> CachingTransport<S, U> {
    pub fn new(store: Arc<S>, upstream: U, writer: WriteBehind, retry: RetryPolicy) -> Self {
        Self {
            store,
            upstream,
            writer,
            retry,
        }
    }

    /// Build a transport and its write-behind pool. Must run inside a tokio runtime.
    pub fn from_config(store: Arc<S>, upstream: U, config: &ProxyConfig) -> Self {
        let writer = WriteBehind::spawn(
            Arc::clone(&store),
            config.cache.write_workers,
            config.cache.write_queue,
        );
        let retry = RetryPolicy::new(config.upstream.retry_delay());
        Self::new(store, upstream, writer, retry)
    }

    /// Produce a response for `request`, from the cache or the upstream.
    pub async fn round_trip(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let start = Instant::now();

        rewrite_host(&mut request);

        let cacheable = is_cacheable(request.method());
        let cache_request = CacheRequest::from_request(&request);

        if cacheable {
            if let Some(response) = self.lookup(&cache_request).await {
                log_served(CacheStatus::Hit, &cache_request, response.status(), start);
                return Ok(response);
            }
        }

        dump::request(&request);

        let response = self.forward(&request).await?;

        let (parts, body) = response.into_parts();
        let body = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(url = %cache_request.uri, error = %e, "Unable to read upstream body");
                return Err(TransportError::ReadBody(e));
            }
        };
        let response = Response::from_parts(parts, body);

        dump::response(&response);

        if cacheable && response.status().is_success() {
            self.writer.submit(WriteJob {
                request: cache_request.clone(),
                response: duplicate(&response),
            });
        }

        log_served(CacheStatus::Miss, &cache_request, response.status(), start);
        Ok(response)
    }

    /// Lookup failures are logged and read as a miss.
    async fn lookup(&self, request: &CacheRequest) -> Option<Response<Bytes>> {
        match self.store.get(request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(url = %request.uri, error = %e, "Unable to query cache");
                metrics::record_cache_error("get");
                None
            }
        }
    }

    async fn forward(&self, request: &Request<Bytes>) -> Result<Response<Body>, UpstreamError> {
        let max_attempts = self.retry.max_attempts(request.method());
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.upstream.send(duplicate_request(request)).await {
                Ok(response) => return Ok(response),
                Err(e) if attempts < max_attempts => {
                    tracing::warn!(
                        url = %request.uri(),
                        attempt = attempts,
                        delay = ?self.retry.delay(),
                        error = %e,
                        "Upstream round trip failed, retrying"
                    );
                    metrics::record_upstream_retry();
                    tokio::time::sleep(self.retry.delay()).await;
                }
                Err(e) => {
                    tracing::error!(
                        url = %request.uri(),
                        attempts,
                        error = %e,
                        "Unable to execute round trip to upstream"
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// GET and HEAD responses are looked up and stored.
pub fn is_cacheable(method: &Method) -> bool {
    is_retryable(method)
}

/// Point `Host` at the URL's own authority so virtual hosting at the origin works.
fn rewrite_host<B>(request: &mut Request<B>) {
    let Some(host) = request.uri().host() else {
        return;
    };
    let host = match request.uri().port_u16() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    match HeaderValue::from_str(&host) {
        Ok(value) => {
            request.headers_mut().insert(header::HOST, value);
        }
        Err(e) => tracing::debug!(host = %host, error = %e, "Unable to rewrite Host header"),
    }
}

/// Independent copy sharing the body buffer. Extensions are not carried over.
fn duplicate(response: &Response<Bytes>) -> Response<Bytes> {
    let mut copy = Response::new(response.body().clone());
    *copy.status_mut() = response.status();
    *copy.version_mut() = response.version();
    *copy.headers_mut() = response.headers().clone();
    copy
}

fn duplicate_request(request: &Request<Bytes>) -> Request<Bytes> {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

fn log_served(cache: CacheStatus, request: &CacheRequest, status: StatusCode, start: Instant) {
    let elapsed = start.elapsed();
    tracing::info!(
        cache = %cache,
        method = %request.method,
        url = %request.uri,
        status = status.as_u16(),
        elapsed = ?elapsed,
        "{} {} {} ({})",
        cache,
        request.method,
        request.uri,
        status.as_u16()
    );
    metrics::record_request(request.method.as_str(), status.as_u16(), cache.as_str(), elapsed);
}
