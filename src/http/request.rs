//! Request handling and transformation.
//!
//! # Responsibilities
//! - Rewrite inbound URIs onto the single upstream origin
//! - Strip hop-by-hop headers
//! - Record the client address in `X-Forwarded-For`
//!
//! # Design Decisions
//! - Upstream path and inbound path are joined with exactly one slash
//! - Upstream query and inbound query are both kept, joined with `&`
//! - Outbound requests are always HTTP/1.1; the client negotiates h2 itself

use std::net::{IpAddr, SocketAddr};

use axum::http::{
    header,
    request::Parts,
    uri::{Authority, PathAndQuery, Scheme},
    HeaderMap, HeaderValue, Request, Uri, Version,
};
use bytes::Bytes;

/// Headers that describe one connection rather than the message.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Error type for an unusable upstream URL.
#[derive(Debug, thiserror::Error)]
#[error("invalid upstream url {0:?}: must be absolute http(s) with a host")]
pub struct TargetError(pub String);

/// The origin every request is forwarded to.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
    path: String,
    query: Option<String>,
}

impl UpstreamTarget {
    pub fn parse(url: &str) -> Result<Self, TargetError> {
        let uri: Uri = url.parse().map_err(|_| TargetError(url.to_string()))?;
        let parts = uri.into_parts();
        let (Some(scheme), Some(authority)) = (parts.scheme, parts.authority) else {
            return Err(TargetError(url.to_string()));
        };
        if scheme != Scheme::HTTP && scheme != Scheme::HTTPS {
            return Err(TargetError(url.to_string()));
        }
        let (path, query) = match parts.path_and_query {
            Some(pq) => (pq.path().to_string(), pq.query().map(str::to_string)),
            None => (String::new(), None),
        };
        Ok(Self {
            scheme,
            authority,
            path,
            query,
        })
    }

    /// Map an inbound URI onto the upstream origin.
    pub fn rewrite_uri(&self, inbound: &Uri) -> Result<Uri, axum::http::Error> {
        let path = single_joining_slash(&self.path, inbound.path());
        let query = match (self.query.as_deref(), inbound.query()) {
            (None | Some(""), q) => q.map(str::to_string),
            (Some(t), None | Some("")) => Some(t.to_string()),
            (Some(t), Some(q)) => Some(format!("{}&{}", t, q)),
        };
        let path_and_query = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };

        Ok(Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(PathAndQuery::try_from(path_and_query)?)
            .build()?)
    }
}

impl std::fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.path)
    }
}

/// Build the request sent to the upstream from an inbound request.
pub fn outbound_request(
    target: &UpstreamTarget,
    parts: Parts,
    body: Bytes,
    client: SocketAddr,
) -> Result<Request<Bytes>, axum::http::Error> {
    let uri = target.rewrite_uri(&parts.uri)?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    append_forwarded_for(&mut headers, client.ip());

    let mut request = Request::new(body);
    *request.method_mut() = parts.method;
    *request.uri_mut() = uri;
    *request.version_mut() = Version::HTTP_11;
    *request.headers_mut() = headers;
    Ok(request)
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let value = if prior.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), ip)
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert("x-forwarded-for", value);
    }
}

fn single_joining_slash(a: &str, b: &str) -> String {
    match (a.ends_with('/'), b.starts_with('/')) {
        (true, true) => format!("{}{}", a, &b[1..]),
        (false, false) => format!("{}/{}", a, b),
        _ => format!("{}{}", a, b),
    }
}
