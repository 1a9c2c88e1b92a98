//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn a buffered proxied response into the client response
//! - Strip hop-by-hop headers
//! - Map round-trip failures to 502 Bad Gateway

use axum::body::Body;
use axum::http::{Response, StatusCode, Version};
use bytes::Bytes;

use crate::http::request::strip_hop_by_hop;

/// Convert a buffered response into the one written to the client.
pub fn into_client_response(response: Response<Bytes>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    parts.version = Version::HTTP_11;
    Response::from_parts(parts, Body::from(body))
}

/// Empty-bodied 502 for a failed round trip.
pub fn bad_gateway() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response
}
