//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.
//! Field names are snake_case; the camelCase spellings used by older
//! property files are accepted as aliases.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the remote-call client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Character encoding for text bodies (utf-8, iso-8859-1, us-ascii).
    pub encoding: String,

    /// Fast retries allowed for transient faults before the budget resets.
    #[serde(alias = "autoRetryCnt")]
    pub auto_retry_cnt: u32,

    /// Keep-alive policy.
    #[serde(alias = "keepAlive")]
    pub keep_alive: KeepAliveConfig,

    /// Ceiling on connections leased to one route (host and port).
    #[serde(alias = "maxConnPerRoute")]
    pub max_conn_per_route: usize,

    /// Ceiling on connections leased process-wide.
    #[serde(alias = "maxConn")]
    pub max_conn: usize,

    /// Hard time-to-live of a pooled connection in milliseconds.
    #[serde(alias = "connTTL")]
    pub conn_ttl_ms: u64,

    /// Timeout configuration; a bare number sets `timeout.default_ms`.
    #[serde(deserialize_with = "timeout_table_or_millis")]
    pub timeout: TimeoutConfig,

    /// Static backend definitions for the built-in resolver.
    pub backends: Vec<BackendConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            auto_retry_cnt: 2,
            keep_alive: KeepAliveConfig::default(),
            max_conn_per_route: 200,
            max_conn: 2000,
            conn_ttl_ms: 60_000,
            timeout: TimeoutConfig::default(),
            backends: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn conn_ttl(&self) -> Duration {
        Duration::from_millis(self.conn_ttl_ms)
    }
}

/// Keep-alive configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Send `Connection: keep-alive` (true) or `Connection: close` (false).
    pub enable: bool,

    /// Idle keep-alive duration when the server gives no hint, in milliseconds.
    #[serde(alias = "ttl")]
    pub ttl_ms: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enable: true,
            ttl_ms: 60_000,
        }
    }
}

impl KeepAliveConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Timeout configuration.
///
/// `default_ms` applies to every phase that has no override of its own.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Shared default in milliseconds.
    pub default_ms: u64,

    /// Waiting for a pooled connection.
    #[serde(alias = "request")]
    pub request_ms: Option<u64>,

    /// Establishing a TCP connection.
    #[serde(alias = "conn")]
    pub conn_ms: Option<u64>,

    /// Receiving the response.
    #[serde(alias = "socket")]
    pub socket_ms: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: 10_000,
            request_ms: None,
            conn_ms: None,
            socket_ms: None,
        }
    }
}

fn timeout_table_or_millis<'de, D>(deserializer: D) -> Result<TimeoutConfig, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Millis(u64),
        Table(TimeoutConfig),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Millis(default_ms) => TimeoutConfig {
            default_ms,
            ..TimeoutConfig::default()
        },
        Repr::Table(table) => table,
    })
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub name: String,

    /// Backend group this server belongs to; the resolver key.
    pub group: String,

    /// Backend address (e.g., "127.0.0.1:3000" or "http://10.0.0.7:8080/api").
    pub address: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Record call metrics through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
