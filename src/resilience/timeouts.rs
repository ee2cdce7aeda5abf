//! Timeout enforcement.
//!
//! # Responsibilities
//! - Resolve the shared default and per-phase overrides once
//! - Hand the transport one deadline per phase: pool acquisition, connect, response
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities inside the transport
//! - A phase's timeout surfaces as that phase's error code, never as a panic

use std::time::Duration;

use crate::config::TimeoutConfig;

/// Resolved per-phase timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Waiting for a pooled connection.
    pub request: Duration,
    /// Establishing a TCP connection.
    pub connect: Duration,
    /// Sending the request and reading the full response.
    pub socket: Duration,
}

impl Timeouts {
    /// Same value for every phase.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            request: timeout,
            connect: timeout,
            socket: timeout,
        }
    }

    pub fn from_config(config: &TimeoutConfig) -> Self {
        let phase = |value: Option<u64>| Duration::from_millis(value.unwrap_or(config.default_ms));
        Self {
            request: phase(config.request_ms),
            connect: phase(config.conn_ms),
            socket: phase(config.socket_ms),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_config(&TimeoutConfig::default())
    }
}
