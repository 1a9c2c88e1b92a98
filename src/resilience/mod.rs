//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → connect timeout (upstream client)
//!     → On failure: retries.rs (retryable method? wait, send once more)
//! ```
//!
//! # Design Decisions
//! - Retries only for cacheable requests (GET, HEAD)
//! - Exactly one retry, after a fixed delay

pub mod retries;

pub use retries::{is_retryable, RetryPolicy};
