//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI flags / environment variables overlay
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → passed by value into the store, transport and server constructors
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no process-wide mutable state
//! - All fields have defaults except the upstream URL
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{Cli, ConfigError};
pub use schema::{CacheConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, UpstreamConfig};
