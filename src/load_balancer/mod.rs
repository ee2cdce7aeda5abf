//! Backend resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Request::execute(path, key, ctx)
//!     → orchestrator asks BackendResolver::resolve(key, ctx, attempt)
//!         - pool.rs (built-in: static groups from config)
//!         - round_robin.rs (rotate through a group)
//!     → BackendResolver::invoke_url(backend, path)
//!     → attempt outcome reported through Backend::count
//! ```
//!
//! # Design Decisions
//! - The resolver is an injected strategy; ranking and health live behind it
//! - Returning `None` is how a resolver ends a call's rotation
//! - Backends own their statistics; the orchestrator only reports into them

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::context::CallContext;

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::{Backend, UpstreamBackend};
pub use pool::BackendManager;

/// Strategy that maps a call key to candidate backends.
pub trait BackendResolver: Send + Sync + fmt::Debug {
    /// Candidate for the given attempt index, or `None` when there is no
    /// (further) candidate.
    fn resolve(&self, key: &str, ctx: &CallContext, attempt: usize) -> Option<Arc<dyn Backend>>;

    /// Absolute URL for a logical path on a backend.
    fn invoke_url(&self, backend: &dyn Backend, path: &str) -> String {
        join_url(backend.base_url(), path)
    }
}

/// Append a logical path to a base URL with exactly one `/` between them.
pub fn join_url(base: &Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
