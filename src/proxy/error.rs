//! Forwarding pipeline errors.

use thiserror::Error;

use crate::jsonapi::DocumentError;
use crate::proxy::transport::TransportError;

/// Failures of a single forwarding pass. Each one becomes a 500 response.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The resolver produced a string that is not an absolute URL.
    #[error("malformed upstream URL '{url}': {reason}")]
    Resolution { url: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to read upstream response body: {0}")]
    BodyRead(#[source] axum::Error),

    #[error("upstream returned an invalid JSON:API document: {0}")]
    Decode(#[from] DocumentError),

    /// The detached outbound task panicked or the runtime shut down under it.
    #[error("outbound request task failed: {0}")]
    Detached(#[from] tokio::task::JoinError),
}

impl ProxyError {
    /// Pipeline stage label for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            ProxyError::Resolution { .. } => "resolve",
            ProxyError::Transport(_) => "transport",
            ProxyError::BodyRead(_) => "body_read",
            ProxyError::Decode(_) => "decode",
            ProxyError::Detached(_) => "detached",
        }
    }
}
