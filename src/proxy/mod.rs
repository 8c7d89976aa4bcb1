//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! AccessContext + inbound Request
//!     → resolver.rs (strategy maps context + base URL to target URL)
//!     → handler.rs (rewrite target, spawn detached outbound call)
//!     → transport.rs (execute request, return response or error)
//!     → handler.rs (read body, copy status/headers, decode document)
//!     → TranslatedResponse
//! ```
//!
//! # Design Decisions
//! - Single pass: no retries, no backoff, failures surface at the failing step
//! - Handler is immutable after `build()` and shared by clone
//! - All URL shape knowledge lives in the resolver

pub mod error;
pub mod handler;
pub mod resolver;
pub mod transport;

pub use error::ProxyError;
pub use handler::{ProxyHandler, ProxyHandlerBuilder};
pub use resolver::{DefaultUrlResolver, UrlResolver};
pub use transport::{HyperTransport, ReqwestTransport, Transport, TransportError};
