//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build transport + handler → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Server stops accepting → In-flight requests drain
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then handler, then listeners
//! - Outbound calls already in flight finish even while draining

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
