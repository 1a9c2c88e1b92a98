//! Debug dumps of upstream traffic.
//!
//! Heads are logged at `debug`; bodies are added at `trace`.

use std::fmt::Write as _;

use axum::http::{HeaderMap, Request, Response};
use bytes::Bytes;
use tracing::Level;

pub fn request(request: &Request<Bytes>) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    let mut out = format!(
        "{} {} {:?}\r\n",
        request.method(),
        request.uri(),
        request.version()
    );
    write_headers(&mut out, request.headers());
    write_body(&mut out, request.body());
    tracing::debug!(dump = %out, "Upstream request");
}

pub fn response(response: &Response<Bytes>) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    let mut out = format!("{:?} {}\r\n", response.version(), response.status());
    write_headers(&mut out, response.headers());
    write_body(&mut out, response.body());
    tracing::debug!(dump = %out, "Upstream response");
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = write!(out, "{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes()));
    }
    out.push_str("\r\n");
}

fn write_body(out: &mut String, body: &Bytes) {
    if tracing::enabled!(Level::TRACE) {
        out.push_str(&String::from_utf8_lossy(body));
    }
}
