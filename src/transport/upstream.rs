//! Outbound HTTP client to the origin.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use http_body_util::Full;
use hyper_rustls::builderstates::WantsSchemes;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A round trip to the origin failed before a response head arrived.
#[derive(Debug, thiserror::Error)]
#[error("upstream round trip failed: {0}")]
pub struct UpstreamError(#[source] BoxError);

impl UpstreamError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

/// Something that can send a request to the origin.
pub trait Upstream: Send + Sync + 'static {
    fn send(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Body>, UpstreamError>> + Send;
}

/// Pooled hyper client speaking HTTP/1.1 (and HTTP/2 over TLS when enabled).
#[derive(Clone)]
pub struct HyperUpstream {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HyperUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, std::io::Error> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        http.set_nodelay(true);

        let builder = tls_builder()?.https_or_http();
        let connector = if config.attempt_http2 {
            builder.enable_http1().enable_http2().wrap_connector(http)
        } else {
            builder.enable_http1().wrap_connector(http)
        };

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build(connector);

        tracing::debug!(
            attempt_http2 = config.attempt_http2,
            connect_timeout_secs = config.connect_timeout_secs,
            "Upstream client ready"
        );
        Ok(Self { client })
    }
}

/// TLS settings on the ring provider, trusting the platform roots when there are any.
fn tls_builder() -> Result<HttpsConnectorBuilder<WantsSchemes>, std::io::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    match HttpsConnectorBuilder::new().with_provider_and_native_roots(Arc::clone(&provider)) {
        Ok(builder) => Ok(builder),
        Err(e) => {
            tracing::warn!(error = %e, "No usable native root certificates, https upstreams will fail verification");
            let tls = rustls::ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()
                .map_err(std::io::Error::other)?
                .with_root_certificates(rustls::RootCertStore::empty())
                .with_no_client_auth();
            Ok(HttpsConnectorBuilder::new().with_tls_config(tls))
        }
    }
}

impl Upstream for HyperUpstream {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Body>, UpstreamError> {
        let (parts, body) = request.into_parts();
        let request = Request::from_parts(parts, Full::new(body));
        let response = self.client.request(request).await.map_err(UpstreamError::new)?;
        Ok(response.map(Body::new))
    }
}
