//! Caching reverse proxy library

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use cache::{CacheBackend, CacheStore};
pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use transport::CachingTransport;
