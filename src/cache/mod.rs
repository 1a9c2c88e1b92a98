//! Cache store subsystem.
//!
//! # Data Flow
//! ```text
//! Caching transport
//!     → CacheStore::get (key.rs derives "<prefix>:<url>")
//!         → embedded.rs (sled) | remote.rs (redis)
//!         → envelope.rs decode → cached response
//!
//! Write-behind worker
//!     → CacheStore::set
//!         → envelope.rs encode → store with TTL
//! ```
//!
//! # Design Decisions
//! - The backend is a closed enum chosen once from the backend URL scheme
//! - Key derivation belongs to the store, not the transport
//! - "Not found" is `Ok(None)`; `Err` is reserved for storage failures
//! - Undecodable entries read as "not found" and are left for TTL cleanup

pub mod embedded;
pub mod envelope;
pub mod key;
pub mod remote;

use std::future::Future;
use std::path::PathBuf;

use axum::http::Response;
use bytes::Bytes;
use url::Url;

use crate::config::schema::CacheConfig;

pub use embedded::EmbeddedStore;
pub use envelope::EnvelopeError;
pub use key::CacheRequest;
pub use remote::RemoteStore;

/// Directory used by the embedded store when the backend URL has no path.
pub const DEFAULT_EMBEDDED_DIR: &str = "cache-proxy";

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("embedded store: {0}")]
    Embedded(#[from] sled::Error),

    #[error("remote store: {0}")]
    Remote(#[from] redis::RedisError),

    #[error("remote store not connected")]
    Disconnected,

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Error type for backend selection at startup.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid backend url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid cache backend {0:?}")]
    UnknownScheme(String),

    #[error("unable to open cache backend: {0}")]
    Open(#[from] CacheError),
}

/// A key-value store for captured responses.
///
/// Implementations own their connection and must tolerate concurrent calls.
pub trait CacheStore: Send + Sync + 'static {
    /// Look up the response stored for `request`. `Ok(None)` means not found.
    fn get(
        &self,
        request: &CacheRequest,
    ) -> impl Future<Output = Result<Option<Response<Bytes>>, CacheError>> + Send;

    /// Store `response` for `request`, replacing any previous entry.
    fn set(
        &self,
        request: &CacheRequest,
        response: &Response<Bytes>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;
}

/// Store flavours selectable by backend URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Embedded,
    Remote,
}

impl BackendKind {
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "embedded" | "sled" => Some(Self::Embedded),
            "remote" | "redis" | "rediss" => Some(Self::Remote),
            _ => None,
        }
    }
}

/// The cache store the proxy runs with.
#[derive(Clone)]
pub enum CacheBackend {
    Embedded(EmbeddedStore),
    Remote(RemoteStore),
}

impl CacheBackend {
    /// Open the store named by `config.backend_url`.
    pub fn from_config(config: &CacheConfig) -> Result<Self, BackendError> {
        let url = Url::parse(&config.backend_url).map_err(|source| BackendError::InvalidUrl {
            url: config.backend_url.clone(),
            source,
        })?;

        match BackendKind::from_scheme(url.scheme()) {
            Some(BackendKind::Embedded) => {
                let path = embedded_path(&url);
                tracing::info!(path = %path.display(), ttl = ?config.ttl, "Opening embedded cache store");
                let store = EmbeddedStore::open(&path, &config.key_prefix, config.ttl)?;
                Ok(Self::Embedded(store))
            }
            Some(BackendKind::Remote) => {
                tracing::info!(host = url.host_str().unwrap_or(""), ttl = ?config.ttl, "Using remote cache store");
                let store = RemoteStore::new(&url, &config.key_prefix, config.ttl)?;
                Ok(Self::Remote(store))
            }
            None => Err(BackendError::UnknownScheme(url.scheme().to_string())),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Embedded(_) => BackendKind::Embedded,
            Self::Remote(_) => BackendKind::Remote,
        }
    }
}

impl CacheStore for CacheBackend {
    async fn get(&self, request: &CacheRequest) -> Result<Option<Response<Bytes>>, CacheError> {
        match self {
            Self::Embedded(store) => store.get(request).await,
            Self::Remote(store) => store.get(request).await,
        }
    }

    async fn set(&self, request: &CacheRequest, response: &Response<Bytes>) -> Result<(), CacheError> {
        match self {
            Self::Embedded(store) => store.set(request, response).await,
            Self::Remote(store) => store.set(request, response).await,
        }
    }
}

/// `embedded:///var/cache/proxy` → `/var/cache/proxy`; an empty path falls
/// back to a directory under the system temp dir.
fn embedded_path(url: &Url) -> PathBuf {
    let path = url.path();
    if path.is_empty() || path == "/" {
        std::env::temp_dir().join(DEFAULT_EMBEDDED_DIR)
    } else {
        PathBuf::from(path)
    }
}
