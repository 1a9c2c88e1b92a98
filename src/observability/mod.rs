//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - One info event per proxied request with its HIT/MISS outcome
//! - Request ID flows through the tower-http trace span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
