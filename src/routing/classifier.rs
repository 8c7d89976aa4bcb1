//! Request classification.
//!
//! # Responsibilities
//! - Strip the configured path prefix
//! - Map (method, path shape) to an AccessContext
//! - Distinguish unknown paths from unsupported methods
//!
//! # Design Decisions
//! - Empty segments are ignored, so trailing slashes are tolerated
//! - Segments stay percent-encoded so they round-trip into the upstream URL
//! - `.` and `..` segments, encoded or not, are never classified; the upstream
//!   URL parser would collapse them and retarget the request
//! - `relationships` as a third segment is reserved for relationship endpoints

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::jsonapi::AccessContext;
use crate::proxy::resolver::is_dot_segment;

/// Why a request could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("no JSON:API endpoint at '{0}'")]
    NotFound(String),

    #[error("method {method} is not allowed on '{path}'")]
    MethodNotAllowed { method: Method, path: String },
}

impl ClassifyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ClassifyError::NotFound(_) => StatusCode::NOT_FOUND,
            ClassifyError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// Classifies inbound requests under a fixed path prefix.
#[derive(Debug, Clone)]
pub struct Classifier {
    prefix: String,
}

impl Classifier {
    /// `prefix` is matched on segment boundaries; "/" means the root.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn classify(&self, method: &Method, path: &str) -> Result<AccessContext, ClassifyError> {
        let not_found = || ClassifyError::NotFound(path.to_string());
        let not_allowed = || ClassifyError::MethodNotAllowed {
            method: method.clone(),
            path: path.to_string(),
        };

        let rest = path.strip_prefix(self.prefix.as_str()).ok_or_else(not_found)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return Err(not_found());
        }

        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        if segments.iter().any(|s| is_dot_segment(s)) {
            return Err(not_found());
        }

        match segments.as_slice() {
            [resource_type] => match *method {
                Method::GET => Ok(AccessContext::search(*resource_type)),
                Method::POST => Ok(AccessContext::create(*resource_type)),
                _ => Err(not_allowed()),
            },
            [resource_type, id] => match *method {
                Method::GET => Ok(AccessContext::fetch(*resource_type, *id)),
                Method::PATCH => Ok(AccessContext::update(*resource_type, *id)),
                Method::DELETE => Ok(AccessContext::delete(*resource_type, *id)),
                _ => Err(not_allowed()),
            },
            [_, _, "relationships"] => Err(not_found()),
            [resource_type, id, relationship] => match *method {
                Method::GET => Ok(AccessContext::fetch_related(*resource_type, *id, *relationship)),
                _ => Err(not_allowed()),
            },
            [resource_type, id, "relationships", relationship] => match *method {
                Method::GET => Ok(AccessContext::fetch_ref(*resource_type, *id, *relationship)),
                _ => Err(not_allowed()),
            },
            _ => Err(not_found()),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("/")
    }
}
