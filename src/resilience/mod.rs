//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request::execute(path, key, ctx)
//!     → retries.rs (resolve, attempt, classify, loop)
//!     → each attempt bounded by timeouts.rs (acquire / connect / socket)
//! ```
//!
//! # Design Decisions
//! - Timeouts are the only cancellation mechanism; every phase has a deadline
//! - Retry decisions depend on the error code namespace, nothing else

pub mod retries;
pub mod timeouts;
