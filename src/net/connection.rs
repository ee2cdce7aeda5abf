//! Outbound connection identity and establishment.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Open a TCP connection within the connect timeout and run the HTTP/1
//!   handshake over it

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use http_body_util::combinators::UnsyncBoxBody;
use bytes::Bytes;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::http::fault::TransportFault;

/// Body type carried on pooled connections.
pub type OutboundBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Relaxed ordering is enough; IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an outbound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connect to `host:port` and hand back the request half of an HTTP/1
/// connection. The connection driver runs as a task on the current runtime.
pub async fn open(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<(ConnectionId, http1::SendRequest<OutboundBody>), TransportFault> {
    let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(TransportFault::on_connect(e)),
        Err(_) => return Err(TransportFault::ConnectTimeout),
    };
    let _ = stream.set_nodelay(true);

    let id = ConnectionId::new();
    let (sender, conn) = match tokio::time::timeout(
        connect_timeout,
        http1::handshake(TokioIo::new(stream)),
    )
    .await
    {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => return Err(TransportFault::Io(e.to_string())),
        Err(_) => return Err(TransportFault::ConnectTimeout),
    };

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::trace!(connection_id = %id, error = %e, "Connection driver ended");
        }
        tracing::trace!(connection_id = %id, "Connection closed");
    });

    tracing::debug!(connection_id = %id, %host, port, "Connection established");
    Ok((id, sender))
}
