//! HTTP transport adapter.
//!
//! # Responsibilities
//! - Own the connection pool, keep-alive policy and per-phase timeouts
//! - Build requests (`build`) and run single attempts against a URL
//! - Fold every transport failure into a classified `CallError`
//!
//! # Design Decisions
//! - The public API is blocking; each attempt runs on a private Tokio
//!   runtime owned by the client, so it must not be called from inside
//!   another runtime
//! - Configuration is read once in `configure` and never mutated afterwards;
//!   concurrent callers share the client by reference without locking
//! - Responses are read in full inside the socket timeout

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION, CONTENT_TYPE, HOST};
use http_body_util::BodyExt;
use tokio::runtime::Runtime;
use url::Url;

use crate::config::validation::validate_config;
use crate::config::{ClientConfig, ConfigError};
use crate::error::{codes, CallError, ClientError};
use crate::http::body::{self, Body};
use crate::http::charset::Charset;
use crate::http::fault::TransportFault;
use crate::http::method::Method;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::load_balancer::{BackendManager, BackendResolver};
use crate::net::keep_alive::KeepAlivePolicy;
use crate::net::pool::{ConnectionPool, Lease, PoolSettings, RouteKey};
use crate::observability::metrics;
use crate::resilience::retries::Orchestrator;
use crate::resilience::timeouts::Timeouts;

/// Thread-safe, blocking HTTP client with failover.
pub struct HttpClient {
    runtime: Runtime,
    pool: ConnectionPool,
    orchestrator: Orchestrator,
    timeouts: Timeouts,
    keep_alive: KeepAlivePolicy,
    encoding: Charset,
    record_metrics: bool,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("pool", &self.pool)
            .field("timeouts", &self.timeouts)
            .field("encoding", &self.encoding)
            .field("auto_retry_cnt", &self.orchestrator.auto_retry_cnt())
            .finish()
    }
}

impl HttpClient {
    /// Client resolving backends from the static groups in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let resolver = Arc::new(BackendManager::new(&config.backends));
        Self::configure(config, resolver)
    }

    /// Validate `config` and set up the pool, runtime and orchestrator.
    pub fn configure(
        config: &ClientConfig,
        resolver: Arc<dyn BackendResolver>,
    ) -> Result<Self, ClientError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let encoding = Charset::from_label(&config.encoding).unwrap_or_default();
        let timeouts = Timeouts::from_config(&config.timeout);
        let keep_alive = KeepAlivePolicy {
            enabled: config.keep_alive.enable,
            ttl: config.keep_alive.ttl(),
            conn_ttl: config.conn_ttl(),
        };
        let record_metrics = config.observability.metrics_enabled;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("failover-client")
            .enable_all()
            .build()
            .map_err(ClientError::Runtime)?;

        let pool = ConnectionPool::new(PoolSettings {
            max_conn: config.max_conn,
            max_conn_per_route: config.max_conn_per_route,
            keep_alive,
            acquire_timeout: timeouts.request,
            connect_timeout: timeouts.connect,
            record_metrics,
        });

        tracing::info!(
            max_conn = config.max_conn,
            max_conn_per_route = config.max_conn_per_route,
            keep_alive = keep_alive.enabled,
            auto_retry_cnt = config.auto_retry_cnt,
            encoding = encoding.label(),
            "HTTP client configured"
        );

        Ok(Self {
            runtime,
            pool,
            orchestrator: Orchestrator::new(resolver, config.auto_retry_cnt),
            timeouts,
            keep_alive,
            encoding,
            record_metrics,
        })
    }

    /// New request for `method`; unknown method names give a POST request.
    pub fn build(&self, method: &str) -> Request<'_> {
        Request::new(self, Method::parse_or_post(method))
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn encoding(&self) -> Charset {
        self.encoding
    }

    /// Idle pooled connections across all routes.
    pub fn idle_connections(&self) -> usize {
        self.pool.idle_count()
    }

    /// Connections currently held by requests.
    pub fn leased_connections(&self) -> usize {
        self.pool.leased_count()
    }

    /// Run one attempt against `url`. On success the connection lease is
    /// stored in `slot` until the request is closed.
    pub(crate) fn round_trip(
        &self,
        method: Method,
        headers: &[(String, String)],
        body: &mut Body,
        url: &str,
        slot: &mut Option<Lease>,
    ) -> Result<Response, CallError> {
        let started = Instant::now();
        let result = self
            .runtime
            .block_on(self.exchange(method, headers, body, url, slot));

        if self.record_metrics {
            metrics::record_attempt(result.as_ref().err().map(CallError::code), started.elapsed());
        }
        match &result {
            Ok(response) => tracing::debug!(
                %method,
                %url,
                status = response.status().as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Attempt completed"
            ),
            Err(e) => tracing::debug!(%method, %url, code = %e.code(), "Attempt failed"),
        }
        result
    }

    async fn exchange(
        &self,
        method: Method,
        headers: &[(String, String)],
        body: &mut Body,
        url: &str,
        slot: &mut Option<Lease>,
    ) -> Result<Response, CallError> {
        let target = Url::parse(url)
            .map_err(|e| CallError::with_source(codes::IO_ERROR, format!("invalid url: {url}"), e))?;
        let route = match RouteKey::from_url(&target) {
            Some(route) if target.scheme() == "http" => route,
            _ => {
                return Err(CallError::new(
                    codes::IO_ERROR,
                    format!("unsupported target: {url}"),
                ))
            }
        };
        let request_headers = self.request_headers(method, headers, body, &target)?;

        let mut lease = self
            .pool
            .acquire(&route)
            .await
            .map_err(|fault| fault.into_call_error(url))?;

        let outbound = if method.carries_entity() {
            body.to_outbound(self.encoding, self.runtime.handle())?
        } else {
            body::empty()
        };
        let mut request = http::Request::new(outbound);
        *request.method_mut() = method.to_http();
        *request.uri_mut() = origin_form(&target)
            .parse()
            .map_err(|e| CallError::with_source(codes::IO_ERROR, format!("invalid url: {url}"), e))?;
        *request.headers_mut() = request_headers.clone();

        let Some(sender) = lease.sender() else {
            return Err(TransportFault::NoResponse.into_call_error(url));
        };
        let exchanged = tokio::time::timeout(self.timeouts.socket, async move {
            sender.ready().await.map_err(|e| (e, false))?;
            let response = sender.send_request(request).await.map_err(|e| (e, false))?;
            let (parts, incoming) = response.into_parts();
            let bytes = incoming.collect().await.map_err(|e| (e, true))?.to_bytes();
            Ok::<_, (hyper::Error, bool)>((parts, bytes))
        })
        .await;

        let (parts, bytes) = match exchanged {
            Ok(Ok(exchanged)) => exchanged,
            Ok(Err((e, head_received))) => {
                let fault = TransportFault::on_exchange(&e, head_received);
                return Err(CallError::with_source(
                    fault.code(),
                    format!("{}: {url}", fault.message()),
                    e,
                ));
            }
            Err(_) => return Err(TransportFault::ReadTimeout.into_call_error(url)),
        };

        if let Some(idle) = self
            .keep_alive
            .reuse_for(&request_headers, parts.version, &parts.headers)
        {
            lease.keep_alive(idle);
        }
        *slot = Some(lease);
        Ok(Response::from_parts(parts, bytes, self.encoding))
    }

    /// Caller headers plus the defaults the caller did not set.
    fn request_headers(
        &self,
        method: Method,
        headers: &[(String, String)],
        body: &Body,
        target: &Url,
    ) -> Result<HeaderMap, CallError> {
        let mut map = HeaderMap::with_capacity(headers.len() + 3);
        for (name, value) in headers {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CallError::with_source(codes::INVALID_HEADER, format!("header name {name:?}"), e)
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                CallError::with_source(codes::INVALID_HEADER, format!("value of header {name:?}"), e)
            })?;
            map.insert(header, value);
        }

        if !map.contains_key(CONNECTION) {
            map.insert(CONNECTION, self.keep_alive.connection_header());
        }
        if !map.contains_key(HOST) {
            let host = match (target.host_str(), target.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            if let Ok(value) = HeaderValue::from_str(&host) {
                map.insert(HOST, value);
            }
        }
        if method.carries_entity() && !map.contains_key(CONTENT_TYPE) {
            if let Some(content_type) = body.content_type(self.encoding) {
                map.insert(CONTENT_TYPE, content_type);
            }
        }
        Ok(map)
    }
}

/// Path and query, as sent on the request line.
fn origin_form(target: &Url) -> String {
    match target.query() {
        Some(query) => format!("{}?{query}", target.path()),
        None => target.path().to_string(),
    }
}
