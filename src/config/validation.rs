//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require an absolute http(s) upstream URL
//! - Check the backend URL names a known store
//! - Validate value ranges (ttl > 0, pool sizes > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;
use url::Url;

use crate::cache::BackendKind;
use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("upstream url is required")]
    MissingUpstream,

    #[error("invalid upstream url {url:?}: {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("invalid listen address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid backend url {url:?}: {reason}")]
    InvalidBackend { url: String, reason: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Check every field of `config`, collecting all problems.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.upstream.url.as_deref() {
        None | Some("") => errors.push(ValidationError::MissingUpstream),
        Some(url) => {
            if let Err(reason) = check_upstream_url(url) {
                errors.push(ValidationError::InvalidUpstream {
                    url: url.to_string(),
                    reason,
                });
            }
        }
    }

    if parse_bind_address(&config.listener.bind_address).is_none() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Err(reason) = check_backend_url(&config.cache.backend_url) {
        errors.push(ValidationError::InvalidBackend {
            url: config.cache.backend_url.clone(),
            reason,
        });
    }

    if config.cache.ttl.is_zero() {
        errors.push(ValidationError::Zero("cache.ttl"));
    }
    if config.cache.write_workers == 0 {
        errors.push(ValidationError::Zero("cache.write_workers"));
    }
    if config.cache.write_queue == 0 {
        errors.push(ValidationError::Zero("cache.write_queue"));
    }
    if config.cache.sweep_interval.is_zero() {
        errors.push(ValidationError::Zero("cache.sweep_interval"));
    }

    if LevelFilter::from_str(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Resolve a listen address. `:port` means all interfaces; host names are looked up.
pub fn parse_bind_address(address: &str) -> Option<SocketAddr> {
    let address = address.trim();
    let address = match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => address.to_string(),
    };
    address.to_socket_addrs().ok()?.next()
}

fn check_upstream_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {:?}", parsed.scheme()));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(())
}

fn check_backend_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    match BackendKind::from_scheme(parsed.scheme()) {
        Some(_) => Ok(()),
        None => Err(format!("invalid cache backend {:?}", parsed.scheme())),
    }
}
