//! Bounded outbound connection pool.
//!
//! # Responsibilities
//! - Cap open connections, leased or idle, process-wide (`max_conn`) and per
//!   route (`max_conn_per_route`)
//! - Hand out idle connections before opening new ones
//! - Expire idle connections by keep-alive deadline and connection TTL
//!
//! # Design Decisions
//! - Limits are semaphores and a connection holds its permits for as long
//!   as it is open, idle included
//! - When the process-wide ceiling is reached, the longest-idle connection
//!   of any route is closed to make room
//! - Waiting for a slot is bounded by the request timeout and surfaces as a
//!   connect timeout
//! - Idle lists are LIFO so the warmest connection is reused first
//! - A [`Lease`] gives its connection back on drop, so release happens on
//!   every exit path

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use hyper::client::conn::http1::SendRequest;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use url::{Host, Url};

use crate::http::fault::TransportFault;
use crate::net::connection::{self, ConnectionId, OutboundBody};
use crate::net::keep_alive::KeepAlivePolicy;
use crate::observability::metrics;

/// Pool sizing and lifetime settings.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub max_conn: usize,
    pub max_conn_per_route: usize,
    pub keep_alive: KeepAlivePolicy,
    /// Bound on waiting for a free slot.
    pub acquire_timeout: Duration,
    pub connect_timeout: Duration,
    pub record_metrics: bool,
}

/// Pool partition: one per scheme-less `host:port`.
///
/// `host` is a DNS name or a bare IP address; IPv6 literals carry no
/// brackets so the value can be handed straight to the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub host: String,
    pub port: u16,
}

impl RouteKey {
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = match url.host()? {
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(addr) => addr.to_string(),
            Host::Ipv6(addr) => addr.to_string(),
        };
        Some(Self {
            host,
            port: url.port_or_known_default()?,
        })
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => write!(f, "[{addr}]:{}", self.port),
            _ => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// Pool slots held by an open connection.
struct Permits {
    _route: OwnedSemaphorePermit,
    _total: OwnedSemaphorePermit,
}

struct IdleConn {
    id: ConnectionId,
    sender: SendRequest<OutboundBody>,
    created: Instant,
    idle_since: Instant,
    expires: Instant,
    permits: Permits,
}

impl IdleConn {
    fn usable(&self, now: Instant) -> bool {
        self.expires > now && !self.sender.is_closed()
    }
}

struct Route {
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<IdleConn>>,
}

impl Route {
    fn idle(&self) -> MutexGuard<'_, Vec<IdleConn>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Most recently returned connection that is still usable.
    fn checkout(&self) -> Option<IdleConn> {
        let now = Instant::now();
        let mut idle = self.idle();
        while let Some(conn) = idle.pop() {
            if conn.usable(now) {
                return Some(conn);
            }
            tracing::trace!(connection_id = %conn.id, "Discarding expired idle connection");
        }
        None
    }
}

/// State shared between the pool and its leases.
struct Shared {
    total: Arc<Semaphore>,
    routes: DashMap<RouteKey, Arc<Route>>,
    leased: AtomicUsize,
    /// Signalled whenever a lease is released.
    released: Notify,
}

impl Shared {
    fn routes(&self) -> Vec<Arc<Route>> {
        self.routes.iter().map(|route| route.value().clone()).collect()
    }

    /// Close idle connections past their deadline on every route.
    fn purge_expired(&self) {
        let now = Instant::now();
        for route in self.routes() {
            route.idle().retain(|conn| {
                let keep = conn.usable(now);
                if !keep {
                    tracing::trace!(connection_id = %conn.id, "Closing expired idle connection");
                }
                keep
            });
        }
    }

    /// Close the connection that has been idle longest, on any route.
    fn evict_oldest_idle(&self) -> bool {
        let oldest = self
            .routes()
            .into_iter()
            .filter_map(|route| {
                let since = route.idle().first().map(|conn| conn.idle_since)?;
                Some((since, route))
            })
            .min_by_key(|(since, _)| *since);
        let Some((_, route)) = oldest else {
            return false;
        };
        let mut idle = route.idle();
        if idle.is_empty() {
            return false;
        }
        let conn = idle.remove(0);
        tracing::debug!(connection_id = %conn.id, "Evicting idle connection to stay under max_conn");
        true
    }
}

/// Shared pool of HTTP/1 connections.
pub struct ConnectionPool {
    shared: Arc<Shared>,
    settings: PoolSettings,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("settings", &self.settings)
            .field("routes", &self.shared.routes.len())
            .field("idle", &self.idle_count())
            .field("leased", &self.leased_count())
            .finish()
    }
}

/// Where an acquired connection comes from.
enum Slot {
    Idle(IdleConn),
    Fresh(Permits),
}

impl ConnectionPool {
    pub fn new(settings: PoolSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                total: Arc::new(Semaphore::new(settings.max_conn)),
                routes: DashMap::new(),
                leased: AtomicUsize::new(0),
                released: Notify::new(),
            }),
            settings,
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Number of idle connections across all routes.
    pub fn idle_count(&self) -> usize {
        self.shared.routes().iter().map(|route| route.idle().len()).sum()
    }

    /// Connections currently leased out.
    pub fn leased_count(&self) -> usize {
        self.shared.leased.load(Ordering::Acquire)
    }

    fn route(&self, key: &RouteKey) -> Arc<Route> {
        self.shared
            .routes
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(Route {
                    permits: Arc::new(Semaphore::new(self.settings.max_conn_per_route)),
                    idle: Mutex::new(Vec::new()),
                })
            })
            .clone()
    }

    /// Wait until the route has an idle connection or room for a new one.
    async fn slot(&self, route: &Route) -> Slot {
        loop {
            let released = self.shared.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            self.shared.purge_expired();
            if let Some(idle) = route.checkout() {
                return Slot::Idle(idle);
            }
            if let Ok(route_permit) = route.permits.clone().try_acquire_owned() {
                let total_permit = match self.shared.total.clone().try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) if self.shared.evict_oldest_idle() => {
                        self.shared.total.clone().try_acquire_owned().ok()
                    }
                    Err(_) => None,
                };
                if let Some(total_permit) = total_permit {
                    return Slot::Fresh(Permits {
                        _route: route_permit,
                        _total: total_permit,
                    });
                }
            }
            released.await;
        }
    }

    /// Lease a connection to `key`, reusing an idle one if possible.
    pub async fn acquire(&self, key: &RouteKey) -> Result<Lease, TransportFault> {
        let route = self.route(key);

        let slot = match tokio::time::timeout(self.settings.acquire_timeout, self.slot(&route)).await
        {
            Ok(slot) => slot,
            Err(_) => {
                tracing::debug!(route = %key, "Timed out waiting for a pooled connection");
                return Err(TransportFault::ConnectTimeout);
            }
        };

        let (id, sender, created, reused, permits) = match slot {
            Slot::Idle(idle) => {
                tracing::trace!(connection_id = %idle.id, route = %key, "Reusing idle connection");
                (idle.id, idle.sender, idle.created, true, idle.permits)
            }
            Slot::Fresh(permits) => {
                let opened =
                    connection::open(&key.host, key.port, self.settings.connect_timeout).await;
                let (id, sender) = match opened {
                    Ok(opened) => opened,
                    Err(fault) => {
                        drop(permits);
                        self.shared.released.notify_waiters();
                        return Err(fault);
                    }
                };
                if self.settings.record_metrics {
                    metrics::record_connection_created(&key.to_string());
                }
                (id, sender, Instant::now(), false, permits)
            }
        };

        self.shared.leased.fetch_add(1, Ordering::AcqRel);
        Ok(Lease {
            id,
            sender: Some(sender),
            created,
            reused,
            keep_alive: None,
            policy: self.settings.keep_alive,
            route,
            shared: self.shared.clone(),
            permits: Some(permits),
        })
    }
}

/// A connection checked out of the pool.
///
/// Dropping the lease gives the connection back to the idle list if
/// [`Lease::keep_alive`] was granted, and closes it otherwise.
pub struct Lease {
    id: ConnectionId,
    sender: Option<SendRequest<OutboundBody>>,
    created: Instant,
    reused: bool,
    keep_alive: Option<Duration>,
    policy: KeepAlivePolicy,
    route: Arc<Route>,
    shared: Arc<Shared>,
    permits: Option<Permits>,
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("reused", &self.reused)
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

impl Lease {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the connection came from the idle list.
    pub fn is_reused(&self) -> bool {
        self.reused
    }

    pub fn sender(&mut self) -> Option<&mut SendRequest<OutboundBody>> {
        self.sender.as_mut()
    }

    /// Allow the connection to idle for `duration` once released.
    pub fn keep_alive(&mut self, duration: Duration) {
        self.keep_alive = Some(duration);
    }

    fn give_back(&mut self) {
        let (Some(sender), Some(permits)) = (self.sender.take(), self.permits.take()) else {
            return;
        };
        if let Some(duration) = self.keep_alive {
            let now = Instant::now();
            let expires = self.policy.idle_deadline(self.created, duration);
            if expires > now && !sender.is_closed() {
                tracing::trace!(connection_id = %self.id, "Returning connection to pool");
                self.route.idle().push(IdleConn {
                    id: self.id,
                    sender,
                    created: self.created,
                    idle_since: now,
                    expires,
                    permits,
                });
                return;
            }
        }
        tracing::trace!(connection_id = %self.id, "Dropping connection");
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.give_back();
        self.shared.leased.fetch_sub(1, Ordering::AcqRel);
        self.shared.purge_expired();
        self.shared.released.notify_waiters();
    }
}
