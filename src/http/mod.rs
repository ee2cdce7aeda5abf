//! HTTP request/response abstraction and transport.
//!
//! # Data Flow
//! ```text
//! HttpClient::build(method)   (method.rs: lookup, POST fallback)
//!     → Request (request.rs: headers, body.rs variant)
//!     → execute(path, key, ctx) → resilience::retries::Orchestrator
//!         → per attempt: client.rs round trip over net::pool
//!         → failures folded by fault.rs into CallError codes
//!     → Response (response.rs, charset.rs for text)
//! ```

pub mod body;
pub mod charset;
pub mod client;
pub mod fault;
pub mod method;
pub mod request;
pub mod response;

pub use body::Body;
pub use charset::Charset;
pub use client::HttpClient;
pub use method::Method;
pub use request::Request;
pub use response::Response;
