//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Apply the configured level, unless `RUST_LOG` says otherwise
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `log` records from dependencies are bridged into tracing

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter for `level`; `RUST_LOG` takes precedence when set.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let result = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if let Err(e) = result {
        tracing::debug!(error = %e, "Logging already initialized");
    }
}
