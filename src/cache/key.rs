//! Cache key derivation.

use axum::http::{Method, Request, Uri};

/// Default prefix for every cache key.
pub const DEFAULT_PREFIX: &str = "cache-proxy";

/// The parts of an outgoing request that address a cache entry.
///
/// The key is built from the URI alone, so a HEAD and a GET for the same URL
/// share one entry. The method is kept because decoding depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub method: Method,
    pub uri: Uri,
}

impl CacheRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri }
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(request.method().clone(), request.uri().clone())
    }

    /// `<prefix>:<full request URL>`, verbatim.
    pub fn key(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self.uri)
    }
}
