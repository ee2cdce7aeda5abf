//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → read once by HttpClient::configure
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the transport copies what it needs
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BackendConfig;
pub use schema::ClientConfig;
pub use schema::KeepAliveConfig;
pub use schema::ObservabilityConfig;
pub use schema::TimeoutConfig;
