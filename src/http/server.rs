//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Open the cache store and build the caching transport
//! - Create the Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Serve on a listener until shutdown
//! - Run the embedded store sweeper alongside the server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::cache::{BackendError, CacheBackend};
use crate::config::ProxyConfig;
use crate::http::request::{outbound_request, TargetError, UpstreamTarget};
use crate::http::response::{bad_gateway, into_client_response};
use crate::lifecycle::shutdown;
use crate::transport::{CachingTransport, HyperUpstream, ProxyTransport};

/// Error type for server construction.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("unable to build upstream client: {0}")]
    Client(#[source] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<ProxyTransport>,
    pub target: Arc<UpstreamTarget>,
}

/// HTTP server for the caching proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    store: Arc<CacheBackend>,
}

impl HttpServer {
    /// Build the server from a validated configuration. Must run inside a tokio runtime.
    pub fn build(config: ProxyConfig) -> Result<Self, StartupError> {
        let target = UpstreamTarget::parse(config.upstream.url.as_deref().unwrap_or_default())?;
        let store = Arc::new(CacheBackend::from_config(&config.cache)?);
        let upstream = HyperUpstream::new(&config.upstream).map_err(StartupError::Client)?;
        let transport = CachingTransport::from_config(Arc::clone(&store), upstream, &config);

        tracing::info!(
            upstream = %target,
            backend = ?store.kind(),
            attempt_http2 = config.upstream.attempt_http2,
            "Caching transport ready"
        );

        let state = AppState {
            transport: Arc::new(transport),
            target: Arc::new(target),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            store,
        })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let CacheBackend::Embedded(store) = self.store.as_ref() {
            let sweeper = store.clone().run_sweeper(self.config.cache.sweep_interval, shutdown.resubscribe());
            tokio::spawn(sweeper);
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        if let CacheBackend::Embedded(store) = self.store.as_ref() {
            if let Err(e) = store.flush().await {
                tracing::warn!(error = %e, "Unable to flush embedded cache store");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward every request through the caching transport.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(client = %client, error = %e, "Unable to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let outbound = match outbound_request(&state.target, parts, body, client) {
        Ok(outbound) => outbound,
        Err(e) => {
            tracing::error!(client = %client, error = %e, "Unable to build upstream request");
            return bad_gateway();
        }
    };

    match state.transport.round_trip(outbound).await {
        Ok(response) => into_client_response(response),
        Err(e) => {
            tracing::error!(client = %client, error = %e, "Proxy round trip failed");
            bad_gateway()
        }
    }
}
