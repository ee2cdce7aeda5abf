//! Backend abstraction.
//!
//! # Responsibilities
//! - Define the contract the orchestrator consumes (`Backend`)
//! - Represent a configured upstream server (`UpstreamBackend`)
//! - Track rolling call statistics with atomics

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use url::Url;

/// One physical endpoint of a logical service.
///
/// Implementations are owned by their resolver; callers only read the base
/// URL and report attempt outcomes.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Stable identifier for logs and metrics.
    fn id(&self) -> &str;

    /// Base URL logical paths are appended to.
    fn base_url(&self) -> &Url;

    /// Record one attempt. Called exactly once per attempt, from any thread.
    fn count(&self, elapsed: Duration, is_error: bool);
}

/// Parse a configured backend address into a base URL.
///
/// Bare `host:port` addresses are taken as plain HTTP.
pub fn parse_base_url(address: &str) -> Result<Url, String> {
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    let url = Url::parse(&candidate).map_err(|e| format!("invalid address '{address}': {e}"))?;
    if url.scheme() != "http" {
        return Err(format!(
            "unsupported scheme '{}' in '{address}'",
            url.scheme()
        ));
    }
    if url.host_str().is_none() {
        return Err(format!("missing host in '{address}'"));
    }
    Ok(url)
}

/// Rolling counters for one backend.
#[derive(Debug, Default)]
pub struct BackendStats {
    calls: AtomicU64,
    errors: AtomicU64,
    total_nanos: AtomicU64,
    last_nanos: AtomicU64,
}

impl BackendStats {
    pub fn record(&self, elapsed: Duration, is_error: bool) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.calls.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.last_nanos.store(nanos, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let calls = self.calls.load(Ordering::Relaxed);
        let total_nanos = self.total_nanos.load(Ordering::Relaxed);
        StatsSnapshot {
            calls,
            errors: self.errors.load(Ordering::Relaxed),
            total_nanos,
            last_nanos: self.last_nanos.load(Ordering::Relaxed),
            avg_nanos: if calls == 0 { 0 } else { total_nanos / calls },
        }
    }
}

/// Point-in-time copy of `BackendStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub calls: u64,
    pub errors: u64,
    pub total_nanos: u64,
    pub last_nanos: u64,
    pub avg_nanos: u64,
}

/// A configured upstream server.
#[derive(Debug)]
pub struct UpstreamBackend {
    name: String,
    base_url: Url,
    stats: BackendStats,
}

impl UpstreamBackend {
    /// Create a new backend.
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
            stats: BackendStats::default(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Backend for UpstreamBackend {
    fn id(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn count(&self, elapsed: Duration, is_error: bool) {
        self.stats.record(elapsed, is_error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn parse_bare_and_full_addresses() {
        let bare = parse_base_url("127.0.0.1:3000").unwrap();
        assert_eq!(bare.as_str(), "http://127.0.0.1:3000/");

        let full = parse_base_url("http://svc.local:8080/api").unwrap();
        assert_eq!(full.path(), "/api");

        assert!(parse_base_url("https://svc.local").is_err());
        assert!(parse_base_url("not an address").is_err());
    }

    #[test]
    fn count_accumulates() {
        let b = UpstreamBackend::new("b1", parse_base_url("127.0.0.1:1").unwrap());
        b.count(Duration::from_millis(10), false);
        b.count(Duration::from_millis(30), true);

        let s = b.stats();
        assert_eq!(s.calls, 2);
        assert_eq!(s.errors, 1);
        assert_eq!(s.last_nanos, 30_000_000);
        assert_eq!(s.avg_nanos, 20_000_000);
    }

    #[test]
    fn count_from_many_threads() {
        let b = Arc::new(UpstreamBackend::new("b1", parse_base_url("127.0.0.1:1").unwrap()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let b = b.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        b.count(Duration::from_nanos(1), i % 2 == 0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let s = b.stats();
        assert_eq!(s.calls, 8000);
        assert_eq!(s.errors, 4000);
        assert_eq!(s.total_nanos, 8000);
    }
}
