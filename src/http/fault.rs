//! Transport failure classification.
//!
//! Every low-level failure the transport can hit is first folded into a
//! [`TransportFault`], and each fault has exactly one error code. The
//! orchestrator's retry policy keys off these codes alone.

use std::io;

use crate::error::{codes, CallError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFault {
    /// No response within the socket timeout.
    ReadTimeout,
    /// TCP connect, handshake or pool acquisition exceeded its timeout.
    ConnectTimeout,
    ConnectionRefused,
    /// The connection was dropped before any response arrived.
    NoResponse,
    Io(String),
}

impl TransportFault {
    pub fn code(&self) -> &'static str {
        match self {
            TransportFault::ReadTimeout => codes::SOCKET_TIMEOUT,
            TransportFault::ConnectTimeout => codes::CONN_TIMEOUT,
            TransportFault::ConnectionRefused => codes::CONN_REFUSED,
            TransportFault::NoResponse => codes::NO_HTTP_RESPONSE,
            TransportFault::Io(_) => codes::IO_ERROR,
        }
    }

    /// Classify a failed TCP connect.
    pub fn on_connect(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => TransportFault::ConnectionRefused,
            io::ErrorKind::TimedOut => TransportFault::ConnectTimeout,
            _ => TransportFault::Io(err.to_string()),
        }
    }

    /// Classify a failure while sending the request or reading the response.
    ///
    /// A connection that closes or resets before the response head arrived
    /// is `NoResponse`, whether or not it came from the idle list. Once the
    /// head is in, a broken body is plain I/O.
    pub fn on_exchange(err: &hyper::Error, head_received: bool) -> Self {
        if err.is_timeout() {
            return TransportFault::ReadTimeout;
        }
        if let Some(io_err) = find_io_error(err) {
            return match io_err.kind() {
                io::ErrorKind::TimedOut => TransportFault::ReadTimeout,
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
                    if !head_received =>
                {
                    TransportFault::NoResponse
                }
                _ => TransportFault::Io(err.to_string()),
            };
        }
        if !head_received && (err.is_incomplete_message() || err.is_canceled() || err.is_closed()) {
            return TransportFault::NoResponse;
        }
        TransportFault::Io(err.to_string())
    }

    pub fn message(&self) -> String {
        match self {
            TransportFault::ReadTimeout => "timed out waiting for response".to_string(),
            TransportFault::ConnectTimeout => "timed out establishing connection".to_string(),
            TransportFault::ConnectionRefused => "connection refused".to_string(),
            TransportFault::NoResponse => "server closed connection without a response".to_string(),
            TransportFault::Io(message) => message.clone(),
        }
    }

    /// Error for an attempt against `url`.
    pub fn into_call_error(self, url: &str) -> CallError {
        CallError::new(self.code(), format!("{}: {url}", self.message()))
    }
}

fn find_io_error(err: &hyper::Error) -> Option<&io::Error> {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        source = cause.source();
    }
    None
}
