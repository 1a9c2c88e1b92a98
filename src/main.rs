//! Caching Reverse Proxy
//!
//! Forwards every request to one upstream origin, serving GET/HEAD from a
//! cache store when it can.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────────────────────────────┐
//!                    │                  CACHING PROXY                     │
//!                    │                                                    │
//!   Client Request   │  ┌─────────┐    ┌──────────────┐   ┌────────────┐  │
//!   ─────────────────┼─▶│  http   │───▶│   caching    │──▶│  upstream  │──┼──▶ Origin
//!                    │  │ server  │    │  transport   │   │  (hyper)   │  │
//!                    │  └─────────┘    └──────┬───────┘   └────────────┘  │
//!                    │                        │ get / write-behind set    │
//!                    │                        ▼                           │
//!                    │              ┌─────────────────────┐               │
//!                    │              │    cache store      │               │
//!                    │              │ embedded │ remote   │               │
//!                    │              │ (sled)   │ (redis)  │               │
//!                    │              └─────────────────────┘               │
//!                    └────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use cache_proxy::config::{loader, validation::parse_bind_address, Cli};
use cache_proxy::http::HttpServer;
use cache_proxy::lifecycle::{signals, Shutdown};
use cache_proxy::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = loader::resolve(&cli)?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!("cache-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        upstream = config.upstream.url.as_deref().unwrap_or_default(),
        bind_address = %config.listener.bind_address,
        backend_url = %config.cache.backend_url,
        ttl = ?config.cache.ttl,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let addr = parse_bind_address(&config.listener.bind_address)
        .ok_or_else(|| format!("invalid listen address {:?}", config.listener.bind_address))?;

    let shutdown = Shutdown::new();
    tokio::spawn(signals::trigger_on_signal(shutdown.clone()));

    let server = HttpServer::build(config)?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
