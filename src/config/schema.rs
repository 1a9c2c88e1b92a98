//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::key::DEFAULT_PREFIX;

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream origin and dial settings.
    pub upstream: UpstreamConfig,

    /// Cache store settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080" or ":8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: ":8080".to_string(),
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin URL every request is forwarded to. Required.
    pub url: Option<String>,

    /// Offer HTTP/2 via ALPN when dialing a TLS upstream.
    pub attempt_http2: bool,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Idle pooled connection lifetime in seconds.
    pub idle_timeout_secs: u64,

    /// Maximum idle pooled connections per host.
    pub max_idle_per_host: usize,

    /// Delay before the single retry of a failed cacheable request, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            attempt_http2: false,
            connect_timeout_secs: 15,
            idle_timeout_secs: 120,
            max_idle_per_host: 20,
            retry_delay_ms: 1000,
        }
    }
}

impl UpstreamConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store selection URL: `embedded://<path>`, `remote://<host>:<port>/<db>`.
    pub backend_url: String,

    /// Lifetime of a cache entry (e.g. "5m").
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Prefix of every cache key.
    pub key_prefix: String,

    /// Number of write-behind workers.
    pub write_workers: usize,

    /// Pending cache writes allowed before new writes are dropped.
    pub write_queue: usize,

    /// How often the embedded store removes expired entries.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend_url: "embedded://".to_string(),
            ttl: Duration::from_secs(5 * 60),
            key_prefix: DEFAULT_PREFIX.to_string(),
            write_workers: 4,
            write_queue: 1024,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
