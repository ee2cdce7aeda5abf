//! Request methods and their construction rules.

use std::fmt;

/// The closed set of methods a request can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Trace,
    Patch,
}

/// Name lookup table; matched case-insensitively.
const METHODS: [(&str, Method); 8] = [
    ("GET", Method::Get),
    ("POST", Method::Post),
    ("PUT", Method::Put),
    ("DELETE", Method::Delete),
    ("HEAD", Method::Head),
    ("OPTIONS", Method::Options),
    ("TRACE", Method::Trace),
    ("PATCH", Method::Patch),
];

impl Method {
    /// Exact lookup, ignoring ASCII case.
    pub fn lookup(name: &str) -> Option<Self> {
        METHODS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|&(_, method)| method)
    }

    /// Lookup with the POST fallback used by `HttpClient::build`.
    ///
    /// Unknown names become POST rather than an error; callers are expected
    /// to validate method names upstream.
    pub fn parse_or_post(name: &str) -> Self {
        match Self::lookup(name) {
            Some(method) => method,
            None => {
                tracing::debug!(method = %name, "Unknown method, using POST");
                Method::Post
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
        }
    }

    /// Whether requests with this method carry an entity body.
    pub fn carries_entity(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    pub fn to_http(self) -> http::Method {
        match self {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
            Method::Head => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
            Method::Trace => http::Method::TRACE,
            Method::Patch => http::Method::PATCH,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
