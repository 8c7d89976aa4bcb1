//! Translated responses handed back to the routing layer.
//!
//! # Responsibilities
//! - Hold the backend status, single-valued headers and decoded document
//! - Represent local failures as uniform internal-error responses
//! - Serialize back into an axum response for the client
//!
//! # Design Decisions
//! - Headers keep exactly one value per name
//! - Framing and hop-by-hop headers copied from the backend are dropped on
//!   serialization; the body is re-encoded and the connection is ours

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::jsonapi::document::{Document, ErrorObject};
use crate::proxy::ProxyError;

/// Media type for JSON:API payloads.
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "content-length",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Response produced by the forwarding pipeline.
#[derive(Debug)]
pub struct TranslatedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` when the backend sent an empty body.
    pub body: Option<Document>,
    /// Set on internal-error responses.
    pub cause: Option<ProxyError>,
}

impl TranslatedResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
            cause: None,
        }
    }

    /// Error response with a JSON:API error document.
    pub fn error(status: StatusCode, detail: impl Into<String>) -> Self {
        let mut response = Self::new(status);
        response.body = Some(Document::from_errors(vec![
            ErrorObject::from_status(status).with_detail(detail),
        ]));
        response
    }

    /// 500 response carrying the underlying cause.
    pub fn internal_error(cause: ProxyError) -> Self {
        let mut response = Self::error(StatusCode::INTERNAL_SERVER_ERROR, cause.to_string());
        response.cause = Some(cause);
        response
    }

    pub fn is_internal_error(&self) -> bool {
        self.cause.is_some()
    }
}

impl IntoResponse for TranslatedResponse {
    fn into_response(self) -> Response {
        let mut headers = self.headers;
        for name in HOP_BY_HOP {
            headers.remove(name);
        }

        let body = match self.body {
            Some(document) => match serde_json::to_vec(&document) {
                Ok(bytes) => {
                    if !headers.contains_key(header::CONTENT_TYPE) {
                        headers.insert(
                            header::CONTENT_TYPE,
                            HeaderValue::from_static(JSONAPI_MEDIA_TYPE),
                        );
                    }
                    Body::from(bytes)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode response document");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode response")
                        .into_response();
                }
            },
            None => Body::empty(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}
