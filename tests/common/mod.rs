//! Shared utilities for integration tests.
//!
//! Mock backends are plain `std::net` servers on their own threads, since
//! the client under test is blocking.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use failover_client::config::{BackendConfig, ClientConfig};

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    /// Header names lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Index of the TCP connection the request arrived on.
    pub connection: usize,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub close: bool,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            close: false,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn closing(mut self) -> Self {
        self.close = true;
        self
    }
}

/// What a programmable backend does with a request.
#[derive(Debug, Clone)]
pub enum Action {
    Reply(Reply),
    /// Read the request, then stay silent for the given time.
    Hang(Duration),
    /// Read the request, then close the connection without answering.
    Drop,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    connections: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Start a mock backend that answers every request with 200 and `body`,
/// keeping connections alive.
pub fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move |_| Action::Reply(Reply::ok(body)))
}

/// Start a mock backend whose behavior is decided per request.
pub fn start_programmable_backend<F>(f: F) -> MockBackend
where
    F: Fn(&Recorded) -> Action + Send + Sync + 'static,
{
    serve_on(TcpListener::bind("127.0.0.1:0").unwrap(), f)
}

/// Like [`start_mock_backend`] but on the IPv6 loopback, or `None` when the
/// host has no IPv6 stack.
pub fn start_ipv6_mock_backend(body: &'static str) -> Option<MockBackend> {
    let listener = TcpListener::bind("[::1]:0").ok()?;
    Some(serve_on(listener, move |_| Action::Reply(Reply::ok(body))))
}

fn serve_on<F>(listener: TcpListener, f: F) -> MockBackend
where
    F: Fn(&Recorded) -> Action + Send + Sync + 'static,
{
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let (reqs, conns) = (requests.clone(), connections.clone());
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let connection = conns.fetch_add(1, Ordering::SeqCst);
            let (f, reqs) = (f.clone(), reqs.clone());
            thread::spawn(move || serve(stream, connection, &*f, &reqs));
        }
    });

    MockBackend {
        addr,
        requests,
        connections,
    }
}

/// An address nothing listens on.
pub fn refused_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Default config with one backend group and short timeouts.
pub fn config_with_group(group: &str, addrs: &[SocketAddr]) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.timeout.default_ms = 1_000;
    config.observability.metrics_enabled = false;
    config.backends = addrs
        .iter()
        .enumerate()
        .map(|(i, addr)| BackendConfig {
            name: format!("{group}-{i}"),
            group: group.to_string(),
            address: addr.to_string(),
        })
        .collect();
    config
}

fn serve(
    stream: TcpStream,
    connection: usize,
    f: &(dyn Fn(&Recorded) -> Action + Send + Sync),
    requests: &Mutex<Vec<Recorded>>,
) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);

    while let Some(request) = read_request(&mut reader, connection) {
        requests.lock().unwrap().push(request.clone());
        match f(&request) {
            Action::Reply(reply) => {
                let client_close = request
                    .header("connection")
                    .is_some_and(|v| v.eq_ignore_ascii_case("close"));
                let close = reply.close || client_close;
                let head_only = request.method == "HEAD";
                if write_reply(&mut writer, &reply, close, head_only).is_err() || close {
                    return;
                }
            }
            Action::Hang(duration) => {
                thread::sleep(duration);
                return;
            }
            Action::Drop => return,
        }
    }
}

fn read_request(reader: &mut BufReader<TcpStream>, connection: usize) -> Option<Recorded> {
    let mut line = String::new();
    if reader.read_line(&mut line).ok()? == 0 {
        return None;
    }
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    let find = |name: &str| {
        headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v): &(String, String)| v.clone())
    };
    let mut body = Vec::new();
    if find("transfer-encoding").is_some_and(|v| v.eq_ignore_ascii_case("chunked")) {
        loop {
            let mut size = String::new();
            reader.read_line(&mut size).ok()?;
            let size = usize::from_str_radix(size.trim(), 16).ok()?;
            let mut chunk = vec![0u8; size + 2];
            reader.read_exact(&mut chunk).ok()?;
            if size == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..size]);
        }
    } else if let Some(len) = find("content-length").and_then(|v| v.parse::<usize>().ok()) {
        body.resize(len, 0);
        reader.read_exact(&mut body).ok()?;
    }

    Some(Recorded {
        method,
        path,
        headers,
        body,
        connection,
    })
}

fn write_reply(
    writer: &mut TcpStream,
    reply: &Reply,
    close: bool,
    head_only: bool,
) -> std::io::Result<()> {
    let mut out = format!("HTTP/1.1 {} Mock\r\nContent-Length: {}\r\n", reply.status, reply.body.len());
    for (name, value) in &reply.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    if close {
        out.push_str("Connection: close\r\n");
    }
    out.push_str("\r\n");

    let mut bytes = out.into_bytes();
    if !head_only {
        bytes.extend_from_slice(&reply.body);
    }
    writer.write_all(&bytes)?;
    writer.flush()
}
