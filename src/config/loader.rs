//! Configuration loading from disk, flags and environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::Parser;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command line of the proxy. Every flag falls back to an environment variable.
#[derive(Debug, Default, Parser)]
#[command(name = "cache-proxy")]
#[command(about = "Caching reverse proxy for a single upstream origin", long_about = None)]
pub struct Cli {
    /// Optional TOML configuration file; flags and env override its values.
    #[arg(short, long, env = "CACHE_PROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Origin every request is forwarded to.
    #[arg(long, env = "UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Listen address, e.g. ":8080".
    #[arg(long, env = "FRONTEND_URL")]
    pub listen: Option<String>,

    /// Cache store URL, e.g. "embedded:///var/cache/proxy" or "remote://localhost:6379/0".
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Cache entry lifetime, e.g. "5m".
    #[arg(long, env = "TTL", value_parser = humantime::parse_duration)]
    pub ttl: Option<Duration>,

    /// Offer HTTP/2 to TLS upstreams.
    #[arg(long, env = "ATTEMPT_HTTP2", value_parser = BoolishValueParser::new())]
    pub attempt_http2: Option<bool>,

    /// Logging threshold (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Prefix of every cache key.
    #[arg(long, env = "CACHE_PREFIX")]
    pub cache_prefix: Option<String>,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,
}

impl Cli {
    /// Overlay every value given on the command line or in the environment.
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(url) = &self.upstream_url {
            config.upstream.url = Some(url.clone());
        }
        if let Some(listen) = &self.listen {
            config.listener.bind_address = listen.clone();
        }
        if let Some(backend_url) = &self.backend_url {
            config.cache.backend_url = backend_url.clone();
        }
        if let Some(ttl) = self.ttl {
            config.cache.ttl = ttl;
        }
        if let Some(attempt_http2) = self.attempt_http2 {
            config.upstream.attempt_http2 = attempt_http2;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(prefix) = &self.cache_prefix {
            config.cache.key_prefix = prefix.clone();
        }
        if let Some(address) = &self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = address.clone();
        }
    }
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Build the effective configuration: file (if any), then flags/env, then validation.
pub fn resolve(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "cache-proxy",
            "--upstream-url",
            "https://origin.local",
            "--listen",
            ":9000",
            "--ttl",
            "90s",
            "--attempt-http2",
            "yes",
        ])
        .unwrap();

        let config = resolve(&cli).unwrap();
        assert_eq!(config.upstream.url.as_deref(), Some("https://origin.local"));
        assert_eq!(config.listener.bind_address, ":9000");
        assert_eq!(config.cache.ttl, Duration::from_secs(90));
        assert!(config.upstream.attempt_http2);
    }

    #[test]
    fn flags_override_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [upstream]
            url = "http://from-file.local"

            [cache]
            backend_url = "embedded:///tmp/from-file"
            ttl = "10m"
            "#
        )
        .unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            upstream_url: Some("http://from-flag.local".to_string()),
            ..Cli::default()
        };
        let config = resolve(&cli).unwrap();
        assert_eq!(config.upstream.url.as_deref(), Some("http://from-flag.local"));
        assert_eq!(config.cache.backend_url, "embedded:///tmp/from-file");
        assert_eq!(config.cache.ttl, Duration::from_secs(600));
    }

    #[test]
    fn missing_upstream_fails_validation() {
        let err = resolve(&Cli::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: upstream url is required");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstream\nurl = 1").unwrap();
        assert!(matches!(read_config(file.path()), Err(ConfigError::Parse(_))));

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            upstream_url: Some("http://origin.local".to_string()),
            ..Cli::default()
        };
        assert!(matches!(resolve(&cli), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn metrics_flag_enables_exporter() {
        let cli = Cli {
            upstream_url: Some("http://origin.local".to_string()),
            metrics_address: Some("127.0.0.1:9191".to_string()),
            ..Cli::default()
        };
        let config = resolve(&cli).unwrap();
        assert!(config.observability.metrics_enabled);
        assert_eq!(config.observability.metrics_address, "127.0.0.1:9191");
    }
}
