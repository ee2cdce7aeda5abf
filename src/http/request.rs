//! Request construction and execution.
//!
//! # Responsibilities
//! - Collect method, headers and one body variant
//! - Execute once against a fixed URL, or through the orchestrator
//! - Hold the connection lease of the last successful attempt until closed
//!
//! # Design Decisions
//! - Headers keep the caller's spelling; setting the same name again
//!   replaces the earlier value
//! - Bodies on methods without an entity are dropped at `set_body`
//! - `close` is idempotent and also runs on drop, so every exit path
//!   releases the connection

use std::fmt;
use std::io::{self, Read, Write};

use bytes::Bytes;

use crate::context::CallContext;
use crate::error::CallError;
use crate::http::body::Body;
use crate::http::charset::Charset;
use crate::http::client::HttpClient;
use crate::http::method::Method;
use crate::http::response::Response;
use crate::net::pool::Lease;

/// One call, built by [`HttpClient::build`].
pub struct Request<'c> {
    client: &'c HttpClient,
    method: Method,
    headers: Vec<(String, String)>,
    body: Body,
    lease: Option<Lease>,
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("lease", &self.lease)
            .finish()
    }
}

impl<'c> Request<'c> {
    pub(crate) fn new(client: &'c HttpClient, method: Method) -> Self {
        Self {
            client,
            method,
            headers: Vec::new(),
            body: Body::Empty,
            lease: None,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Set a header; the last value set for a name wins.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Replace the body. Ignored for methods that carry no entity.
    pub fn set_body(&mut self, body: Body) -> &mut Self {
        if self.method.carries_entity() {
            self.body = body;
        } else {
            tracing::debug!(method = %self.method, "Ignoring body for method without entity");
        }
        self
    }

    /// Text encoded with the client's configured encoding.
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.set_body(Body::Text {
            text: text.into(),
            charset: None,
        })
    }

    pub fn set_text_with(&mut self, text: impl Into<String>, charset: Charset) -> &mut Self {
        self.set_body(Body::Text {
            text: text.into(),
            charset: Some(charset),
        })
    }

    pub fn set_bytes(&mut self, bytes: impl Into<Bytes>) -> &mut Self {
        self.set_body(Body::Bytes(bytes.into()))
    }

    /// Stream the body from `reader`. A reader can be sent only once, so a
    /// retried call fails with `client.body_consumed`.
    pub fn set_reader(&mut self, reader: impl Read + Send + 'static) -> &mut Self {
        self.set_body(Body::reader(reader))
    }

    /// Produce the body with `write`, called once per attempt.
    pub fn set_writer<F>(&mut self, write: F) -> &mut Self
    where
        F: FnMut(&mut dyn Write) -> io::Result<()> + Send + 'static,
    {
        self.set_body(Body::writer(write))
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Single attempt against a fixed absolute URL, without backend resolution.
    pub fn execute_url(&mut self, url: &str) -> Result<Response, CallError> {
        self.attempt(url)
    }

    /// Call `path` on backends resolved for `key`, retrying and failing over
    /// per the client's policy.
    pub fn execute(
        &mut self,
        path: &str,
        key: &str,
        ctx: &CallContext,
    ) -> Result<Response, CallError> {
        let client = self.client;
        client
            .orchestrator()
            .execute(path, key, ctx, |url| self.attempt(url))
    }

    fn attempt(&mut self, url: &str) -> Result<Response, CallError> {
        self.close();
        self.client.round_trip(
            self.method,
            &self.headers,
            &mut self.body,
            url,
            &mut self.lease,
        )
    }

    /// Release the connection held by this request. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(lease) = self.lease.take() {
            tracing::trace!(connection_id = %lease.id(), "Request closed");
        }
    }
}

impl Drop for Request<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
