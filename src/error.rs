//! Call error taxonomy.
//!
//! # Codes
//! Every failure travels as a `namespace.reason` code:
//! - `internal.*`: connectivity fault, presumed transient and endpoint-independent
//! - `core.*`: the exchange completed but failed, or I/O broke mid-exchange
//! - anything else: caller or programmer error, never retried
//!
//! # Design Decisions
//! - The namespace alone drives retry policy (see `resilience::retries`)
//! - Construction errors (config, runtime) are a separate type, `ClientError`

use std::io;

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Boxed cause carried by a `CallError`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Well-known error codes.
pub mod codes {
    /// Response not received within the socket timeout.
    pub const SOCKET_TIMEOUT: &str = "core.socket_timeout";
    /// Any I/O failure without a more specific code.
    pub const IO_ERROR: &str = "core.io_error";
    /// Connect (or pool acquisition) timed out.
    pub const CONN_TIMEOUT: &str = "internal.conn_timeout";
    /// The peer refused the connection.
    pub const CONN_REFUSED: &str = "internal.conn_refused";
    /// A kept-alive connection closed before any response arrived.
    pub const NO_HTTP_RESPONSE: &str = "internal.no_http_response";
    /// A single-use stream body was already sent by an earlier attempt.
    pub const BODY_CONSUMED: &str = "client.body_consumed";
    /// A header name or value is not valid on the wire.
    pub const INVALID_HEADER: &str = "client.invalid_header";
}

const INTERNAL_PREFIX: &str = "internal.";
const CORE_PREFIX: &str = "core.";

/// How the orchestrator treats a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// `internal.*`: retry fast, bounded by the auto-retry cap.
    Transient,
    /// `core.*`: rotate to the next candidate, consuming rotation budget.
    Completed,
    /// Any other namespace: surface immediately.
    Fatal,
}

/// A classified call failure.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct CallError {
    code: String,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl CallError {
    /// Create an error without a cause.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping the underlying cause.
    pub fn with_source(
        code: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The part of the code before the first `.`.
    pub fn namespace(&self) -> &str {
        self.code.split('.').next().unwrap_or_default()
    }

    /// Classify by namespace prefix.
    pub fn class(&self) -> ErrorClass {
        if self.code.starts_with(INTERNAL_PREFIX) {
            ErrorClass::Transient
        } else if self.code.starts_with(CORE_PREFIX) {
            ErrorClass::Completed
        } else {
            ErrorClass::Fatal
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class() != ErrorClass::Fatal
    }
}

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport runtime could not be started.
    #[error("failed to start transport runtime: {0}")]
    Runtime(#[source] io::Error),
}
