//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate throughout; this module only installs a subscriber
//! - `RUST_LOG` overrides the configured level
//! - Installing twice is harmless; the first subscriber wins

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a formatting subscriber filtered by `RUST_LOG`, falling back to
/// `default_level` (e.g. `info` or `failover_client=debug`).
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .is_err()
    {
        tracing::debug!("Subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init("debug");
        init("not a [valid filter");
        tracing::info!("still logging");
    }
}
