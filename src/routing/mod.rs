//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → classifier.rs (strip prefix, match path shape and method)
//!     → Return: AccessContext or ClassifyError (404 / 405)
//! ```
//!
//! # Design Decisions
//! - Classifier built at startup, immutable at runtime
//! - No regex in hot path (segment slice matching only)
//! - Deterministic: same input always yields the same context
//! - Only the inbound shape is known here; upstream shape belongs to the resolver

pub mod classifier;

pub use classifier::{ClassifyError, Classifier};
