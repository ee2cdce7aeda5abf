//! Response handling.
//!
//! # Responsibilities
//! - Hold status, headers and the fully-read body of a successful attempt
//! - Report the declared encoding and decode text with it
//!
//! # Design Decisions
//! - The body is read off the wire before the response is returned, so a
//!   slow or truncated body surfaces as a classified error inside the call
//! - Non-2xx statuses are still successful responses; interpreting them is
//!   the caller's business

use std::io::Read;

use bytes::{Buf, Bytes};
use http::{HeaderMap, StatusCode};

use crate::http::charset::Charset;

/// Result of a successful attempt.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    encoding: Charset,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, encoding: Charset) -> Self {
        Self {
            status,
            headers,
            body,
            encoding,
        }
    }

    /// Build from wire parts; the declared encoding is the `Content-Type`
    /// charset when present, else `fallback`.
    pub(crate) fn from_parts(parts: http::response::Parts, body: Bytes, fallback: Charset) -> Self {
        let encoding = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(Charset::from_content_type)
            .unwrap_or(fallback);
        Self::new(parts.status, parts.headers, body, encoding)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn encoding(&self) -> Charset {
        self.encoding
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded with the declared encoding.
    pub fn text(&self) -> String {
        self.encoding.decode(&self.body)
    }

    /// Body as a reader.
    pub fn reader(&self) -> impl Read {
        self.body.clone().reader()
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}
