//! Outbound network layer.
//!
//! # Data Flow
//! ```text
//! HttpClient attempt
//!     → pool.rs (route permits, idle reuse, lease)
//!     → connection.rs (TCP connect + HTTP/1 handshake when nothing idles)
//!     → exchange on the leased connection
//!     → keep_alive.rs (may the connection idle, and until when)
//!     → Lease dropped: back to the idle list or closed
//! ```
//!
//! # Design Decisions
//! - Pool limits cover leased connections; idle ones do not count
//! - Each connection is driven by its own task on the client runtime

pub mod connection;
pub mod keep_alive;
pub mod pool;
