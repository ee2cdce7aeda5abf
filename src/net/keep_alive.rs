//! Connection reuse policy.
//!
//! Decides, per exchange, whether a connection goes back to its route's idle
//! list and for how long it may stay there.

use std::time::{Duration, Instant};

use http::header::{HeaderMap, HeaderValue, CONNECTION};
use http::Version;

/// Keep-alive settings resolved from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlivePolicy {
    pub enabled: bool,
    /// Idle lifetime used when the server does not advertise one.
    pub ttl: Duration,
    /// Upper bound on a connection's total lifetime.
    pub conn_ttl: Duration,
}

impl KeepAlivePolicy {
    /// Value for the default `Connection` header.
    pub fn connection_header(&self) -> HeaderValue {
        if self.enabled {
            HeaderValue::from_static("keep-alive")
        } else {
            HeaderValue::from_static("close")
        }
    }

    /// Idle duration granted after an exchange, or `None` if the connection
    /// must not be reused.
    pub fn reuse_for(
        &self,
        request: &HeaderMap,
        version: Version,
        response: &HeaderMap,
    ) -> Option<Duration> {
        if !self.enabled || has_token(request, "close") || has_token(response, "close") {
            return None;
        }
        if version == Version::HTTP_10 && !has_token(response, "keep-alive") {
            return None;
        }
        Some(parse_keep_alive_timeout(response).unwrap_or(self.ttl))
    }

    /// Instant after which an idle connection is discarded.
    pub fn idle_deadline(&self, created: Instant, keep_alive: Duration) -> Instant {
        (Instant::now() + keep_alive).min(created + self.conn_ttl)
    }
}

/// `timeout=N` (seconds) from a `Keep-Alive` response header.
pub fn parse_keep_alive_timeout(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get_all("keep-alive")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(|param| {
            let (name, value) = param.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("timeout") {
                value.trim().parse::<u64>().ok().map(Duration::from_secs)
            } else {
                None
            }
        })
}

fn has_token(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> KeepAlivePolicy {
        KeepAlivePolicy {
            enabled: true,
            ttl: Duration::from_secs(60),
            conn_ttl: Duration::from_secs(120),
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn server_timeout_wins_over_configured_ttl() {
        let res = headers(&[("keep-alive", "max=100, timeout=5")]);
        assert_eq!(
            policy().reuse_for(&HeaderMap::new(), Version::HTTP_11, &res),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            policy().reuse_for(&HeaderMap::new(), Version::HTTP_11, &HeaderMap::new()),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn close_on_either_side_prevents_reuse() {
        let close = headers(&[("connection", "Close")]);
        assert_eq!(policy().reuse_for(&close, Version::HTTP_11, &HeaderMap::new()), None);
        assert_eq!(policy().reuse_for(&HeaderMap::new(), Version::HTTP_11, &close), None);

        let disabled = KeepAlivePolicy { enabled: false, ..policy() };
        assert_eq!(disabled.reuse_for(&HeaderMap::new(), Version::HTTP_11, &HeaderMap::new()), None);
        assert_eq!(disabled.connection_header(), "close");
    }

    #[test]
    fn http10_needs_explicit_keep_alive() {
        assert_eq!(policy().reuse_for(&HeaderMap::new(), Version::HTTP_10, &HeaderMap::new()), None);
        let res = headers(&[("connection", "keep-alive")]);
        assert!(policy().reuse_for(&HeaderMap::new(), Version::HTTP_10, &res).is_some());
    }

    #[test]
    fn idle_deadline_capped_by_connection_lifetime() {
        let created = Instant::now() - Duration::from_secs(100);
        let deadline = policy().idle_deadline(created, Duration::from_secs(60));
        assert_eq!(deadline, created + Duration::from_secs(120));
    }
}
