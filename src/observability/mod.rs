//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator / transport / pool produce:
//!     → tracing events and spans (call_id per logical call)
//!     → logging.rs (subscriber with env filter)
//!     → metrics.rs (attempt counters, latency, pool growth)
//! ```

pub mod logging;
pub mod metrics;
