//! Outbound transport subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request (from the http frontend)
//!     → caching.rs (cache lookup, forward, retry, buffer body)
//!         → cache store get
//!         → upstream.rs (hyper client, TLS, pooling)
//!     → write_behind.rs (bounded pool performs cache store set)
//!     → dump.rs (debug/trace dumps of upstream traffic)
//! ```
//!
//! # Design Decisions
//! - The transport owns no per-request state; one instance serves every request
//! - The store handle is the only shared mutable resource
//! - Cache writes never delay the response

pub mod caching;
pub mod dump;
pub mod upstream;
pub mod write_behind;

pub use caching::{is_cacheable, CacheStatus, CachingTransport, TransportError};
pub use upstream::{HyperUpstream, Upstream, UpstreamError};
pub use write_behind::{Submitted, WriteBehind, WriteJob};

use crate::cache::CacheBackend;

/// The transport the server runs with.
pub type ProxyTransport = CachingTransport<CacheBackend, HyperUpstream>;
