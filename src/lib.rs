//! Resilient remote-call client.
//!
//! Issues HTTP calls to a logical service backed by several endpoints,
//! classifies failures into `namespace.reason` codes and retries, rotates
//! or fails fast accordingly.

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::ClientConfig;
pub use context::CallContext;
pub use error::{CallError, ClientError, ErrorClass};
pub use crate::http::{Body, Charset, HttpClient, Method, Request, Response};
pub use load_balancer::{Backend, BackendManager, BackendResolver, UpstreamBackend};
pub use resilience::retries::Orchestrator;
