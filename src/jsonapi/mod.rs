//! JSON:API data model.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → context.rs (AccessContext: type, id, relationship, operation kind)
//!     → [proxy pipeline resolves and forwards]
//!     → document.rs (decode backend body into a Document)
//!     → response.rs (TranslatedResponse: status, headers, optional Document)
//!     → serialized back to the client
//! ```
//!
//! # Design Decisions
//! - AccessContext is immutable and passed explicitly, never stored globally
//! - Documents are decoded leniently (unknown members ignored) but the
//!   top-level structure is validated
//! - An empty backend body yields no document at all, not an empty one

pub mod context;
pub mod document;
pub mod response;

pub use context::{AccessContext, OperationKind};
pub use document::{Document, DocumentError, ErrorObject, Link, LinkObject, PrimaryData, Resource};
pub use response::{TranslatedResponse, JSONAPI_MEDIA_TYPE};
