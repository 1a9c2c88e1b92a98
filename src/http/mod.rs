//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → request.rs (rewrite onto the upstream, strip hop-by-hop, X-Forwarded-For)
//!     → transport::CachingTransport (cache lookup or upstream round trip)
//!     → response.rs (strip hop-by-hop, 502 on failure)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{outbound_request, TargetError, UpstreamTarget};
pub use server::{HttpServer, StartupError};
