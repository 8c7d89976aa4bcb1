//! JSON:API forwarding proxy library.
//!
//! Forwards JSON:API requests to a backend server: a pluggable URL resolver
//! maps each classified operation to a backend URL, the request is relayed
//! through an injected transport, and the response is translated back into a
//! structured JSON:API response.

pub mod config;
pub mod http;
pub mod jsonapi;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use jsonapi::{AccessContext, Document, OperationKind, TranslatedResponse};
pub use lifecycle::Shutdown;
pub use proxy::{DefaultUrlResolver, ProxyError, ProxyHandler, Transport, UrlResolver};
