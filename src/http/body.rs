//! Request bodies.
//!
//! A request carries exactly one body variant. Buffered variants are
//! re-sendable; a reader is consumed by the first attempt that sends it, and
//! a writer callback is invoked afresh for every attempt.

use std::convert::Infallible;
use std::fmt;
use std::io::{self, BufWriter, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http::HeaderValue;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{codes, CallError};
use crate::http::charset::Charset;
use crate::net::connection::OutboundBody;

/// Chunk size for streamed bodies.
const CHUNK_SIZE: usize = 8 * 1024;
/// Chunks buffered between the producer thread and the connection.
const CHANNEL_DEPTH: usize = 4;

/// Callback that writes a body to the wire.
pub type WriteFn = Box<dyn FnMut(&mut dyn Write) -> io::Result<()> + Send>;

#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    /// Text encoded with `charset`, or the client's configured encoding.
    Text {
        text: String,
        charset: Option<Charset>,
    },
    Bytes(Bytes),
    /// Single-use stream; `None` once sent.
    Reader(Option<Box<dyn Read + Send>>),
    Writer(Arc<Mutex<WriteFn>>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Text { text, charset } => f
                .debug_struct("Text")
                .field("len", &text.len())
                .field("charset", charset)
                .finish(),
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Reader(reader) => f
                .debug_tuple("Reader")
                .field(&if reader.is_some() { "pending" } else { "consumed" })
                .finish(),
            Body::Writer(_) => f.write_str("Writer"),
        }
    }
}

impl Body {
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Body::Reader(Some(Box::new(reader)))
    }

    pub fn writer<F>(write: F) -> Self
    where
        F: FnMut(&mut dyn Write) -> io::Result<()> + Send + 'static,
    {
        Body::Writer(Arc::new(Mutex::new(Box::new(write))))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Default `Content-Type` for this variant, if it implies one.
    pub(crate) fn content_type(&self, fallback: Charset) -> Option<HeaderValue> {
        match self {
            Body::Text { charset, .. } => {
                let label = charset.unwrap_or(fallback).label();
                HeaderValue::from_str(&format!("text/plain; charset={label}")).ok()
            }
            _ => None,
        }
    }

    /// Wire body for one attempt. Streamed variants are pumped by a blocking
    /// task on `runtime`.
    pub(crate) fn to_outbound(
        &mut self,
        fallback: Charset,
        runtime: &Handle,
    ) -> Result<OutboundBody, CallError> {
        let body = match self {
            Body::Empty => empty(),
            Body::Text { text, charset } => full(charset.unwrap_or(fallback).encode(text)),
            Body::Bytes(bytes) => full(bytes.clone()),
            Body::Reader(reader) => {
                let reader = reader.take().ok_or_else(|| {
                    CallError::new(codes::BODY_CONSUMED, "stream body was already sent")
                })?;
                let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
                runtime.spawn_blocking(move || pump_reader(reader, tx));
                channel_body(rx)
            }
            Body::Writer(write) => {
                let write = Arc::clone(write);
                let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
                runtime.spawn_blocking(move || pump_writer(&write, tx));
                channel_body(rx)
            }
        };
        Ok(body)
    }
}

pub(crate) fn empty() -> OutboundBody {
    Empty::<Bytes>::new()
        .map_err(|never: Infallible| -> io::Error { match never {} })
        .boxed_unsync()
}

fn full(bytes: Bytes) -> OutboundBody {
    Full::new(bytes)
        .map_err(|never: Infallible| -> io::Error { match never {} })
        .boxed_unsync()
}

type Chunk = io::Result<Bytes>;

fn channel_body(rx: mpsc::Receiver<Chunk>) -> OutboundBody {
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        let chunk = rx.recv().await?;
        Some((chunk.map(Frame::data), rx))
    });
    StreamBody::new(stream).boxed_unsync()
}

fn pump_reader(mut reader: Box<dyn Read + Send>, tx: mpsc::Sender<Chunk>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let chunk = match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => Ok(Bytes::copy_from_slice(&buf[..n])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => Err(e),
        };
        let failed = chunk.is_err();
        if tx.blocking_send(chunk).is_err() || failed {
            return;
        }
    }
}

fn pump_writer(write: &Mutex<WriteFn>, tx: mpsc::Sender<Chunk>) {
    let mut write = write.lock().unwrap_or_else(PoisonError::into_inner);
    let mut out = BufWriter::with_capacity(CHUNK_SIZE, ChannelWriter { tx: tx.clone() });
    let write = &mut *write;
    let result = write(&mut out).and_then(|()| out.flush());
    drop(out);
    if let Err(e) = result {
        let _ = tx.blocking_send(Err(e));
    }
}

/// `Write` adapter feeding chunks to the connection.
struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "request body no longer read"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(body: OutboundBody, rt: &tokio::runtime::Runtime) -> io::Result<Bytes> {
        rt.block_on(async { body.collect().await.map(|c| c.to_bytes()) })
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn text_uses_explicit_or_fallback_charset() {
        let rt = runtime();
        let mut body = Body::Text {
            text: "café".into(),
            charset: None,
        };
        assert_eq!(
            body.content_type(Charset::Latin1).unwrap(),
            "text/plain; charset=ISO-8859-1"
        );
        let bytes = collect(body.to_outbound(Charset::Latin1, rt.handle()).unwrap(), &rt).unwrap();
        assert_eq!(&bytes[..], b"caf\xe9");

        let mut body = Body::Text {
            text: "café".into(),
            charset: Some(Charset::Utf8),
        };
        let bytes = collect(body.to_outbound(Charset::Latin1, rt.handle()).unwrap(), &rt).unwrap();
        assert_eq!(&bytes[..], "café".as_bytes());
    }

    #[test]
    fn reader_is_single_use() {
        let rt = runtime();
        let payload = vec![7u8; CHUNK_SIZE * 3 + 11];
        let mut body = Body::reader(io::Cursor::new(payload.clone()));

        let bytes = collect(body.to_outbound(Charset::Utf8, rt.handle()).unwrap(), &rt).unwrap();
        assert_eq!(bytes.len(), payload.len());

        let err = body.to_outbound(Charset::Utf8, rt.handle()).unwrap_err();
        assert_eq!(err.code(), codes::BODY_CONSUMED);
        assert!(!err.is_retryable());
    }

    #[test]
    fn writer_runs_once_per_attempt() {
        let rt = runtime();
        let mut body = Body::writer(|out: &mut dyn Write| out.write_all(b"hello"));
        for _ in 0..2 {
            let bytes = collect(body.to_outbound(Charset::Utf8, rt.handle()).unwrap(), &rt).unwrap();
            assert_eq!(&bytes[..], b"hello");
        }
    }

    #[test]
    fn writer_error_reaches_the_wire_body() {
        let rt = runtime();
        let mut body = Body::writer(|out: &mut dyn Write| {
            out.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "source failed"))
        });
        let err = collect(body.to_outbound(Charset::Utf8, rt.handle()).unwrap(), &rt).unwrap_err();
        assert_eq!(err.to_string(), "source failed");
    }
}
