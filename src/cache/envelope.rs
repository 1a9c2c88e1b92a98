//! Response envelope codec.
//!
//! An envelope is a complete HTTP/1.1 response message: status line, every
//! header line in its original order and multiplicity, a blank line, then the
//! raw body bytes. It is the value format shared by every cache store.
//!
//! # Design Decisions
//! - Bodies are stored de-chunked, so `Transfer-Encoding` is never written
//! - Decoding needs the request method: a HEAD response never has a body
//! - Every malformed input is an [`EnvelopeError`], never a panic

use axum::http::{
    header, HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode, Version,
};
use bytes::{BufMut, Bytes, BytesMut};

/// Initial header slots offered to the parser; doubled up to [`MAX_HEADERS`].
const INITIAL_HEADERS: usize = 64;

/// Upper bound on header lines in one envelope.
const MAX_HEADERS: usize = 4096;

/// Error type for envelope decoding.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The bytes are not a well-formed HTTP/1.x response head.
    #[error("malformed response head: {0}")]
    Malformed(#[from] httparse::Error),

    /// The response head ended before the blank line, or the body is shorter
    /// than its declared length.
    #[error("truncated envelope")]
    Truncated,

    /// The status code is outside 100..=999.
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    /// A header name or value could not be represented.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    /// `Content-Length` is missing digits or disagrees with itself.
    #[error("invalid content-length")]
    InvalidContentLength,
}

/// Serialize a buffered response into envelope bytes.
pub fn encode(response: &Response<Bytes>) -> Bytes {
    let status = response.status();
    let body = response.body();

    let mut buf = BytesMut::with_capacity(128 + body.len());
    buf.put_slice(b"HTTP/1.1 ");
    buf.put_slice(status.as_str().as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(status.canonical_reason().unwrap_or("").as_bytes());
    buf.put_slice(b"\r\n");

    for (name, value) in response.headers() {
        if name == header::TRANSFER_ENCODING {
            continue;
        }
        buf.put_slice(name.as_str().as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(value.as_bytes());
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(b"\r\n");
    buf.put_slice(body);

    buf.freeze()
}

/// Rebuild a response from envelope bytes for a request made with `method`.
pub fn decode(raw: Bytes, method: &Method) -> Result<Response<Bytes>, EnvelopeError> {
    let mut slots = INITIAL_HEADERS;
    loop {
        match decode_with(&raw, method, slots) {
            Err(EnvelopeError::Malformed(httparse::Error::TooManyHeaders)) if slots < MAX_HEADERS => {
                slots *= 2;
            }
            other => return other,
        }
    }
}

fn decode_with(raw: &Bytes, method: &Method, slots: usize) -> Result<Response<Bytes>, EnvelopeError> {
    let mut headers = vec![httparse::EMPTY_HEADER; slots];
    let mut parsed = httparse::Response::new(&mut headers);

    let head_len = match parsed.parse(raw)? {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Err(EnvelopeError::Truncated),
    };

    let code = parsed.code.ok_or(EnvelopeError::Truncated)?;
    let status = StatusCode::from_u16(code).map_err(|_| EnvelopeError::InvalidStatus(code))?;

    let mut header_map = HeaderMap::with_capacity(parsed.headers.len());
    for h in parsed.headers.iter() {
        let name = HeaderName::from_bytes(h.name.as_bytes())
            .map_err(|_| EnvelopeError::InvalidHeader(h.name.to_string()))?;
        let value = HeaderValue::from_bytes(h.value)
            .map_err(|_| EnvelopeError::InvalidHeader(h.name.to_string()))?;
        header_map.append(name, value);
    }

    let rest = raw.slice(head_len..);
    let body = if !carries_body(method, status) {
        Bytes::new()
    } else {
        match content_length(&header_map)? {
            Some(len) if rest.len() < len => return Err(EnvelopeError::Truncated),
            Some(len) => rest.slice(..len),
            None => rest,
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.version_mut() = Version::HTTP_11;
    *response.headers_mut() = header_map;
    Ok(response)
}

fn carries_body(method: &Method, status: StatusCode) -> bool {
    *method != Method::HEAD
        && !status.is_informational()
        && status != StatusCode::NO_CONTENT
        && status != StatusCode::NOT_MODIFIED
}

/// All `Content-Length` values must agree.
fn content_length(headers: &HeaderMap) -> Result<Option<usize>, EnvelopeError> {
    let mut length = None;
    for value in headers.get_all(header::CONTENT_LENGTH) {
        let parsed = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or(EnvelopeError::InvalidContentLength)?;
        match length {
            Some(previous) if previous != parsed => return Err(EnvelopeError::InvalidContentLength),
            _ => length = Some(parsed),
        }
    }
    Ok(length)
}
