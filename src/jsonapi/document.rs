//! JSON:API document types.
//!
//! # Responsibilities
//! - Deserialize backend bodies into a typed top-level document
//! - Enforce the top-level structure rules (data/errors/meta presence)
//! - Build error documents for locally generated failures
//!
//! # Design Decisions
//! - Unknown members (extensions, profiles) are kept in `extra` and written back
//!   unchanged when the document is re-encoded
//! - `data: null` is kept distinct from an absent `data` member
//! - Attributes and meta stay as raw JSON maps; the proxy never interprets them

use axum::http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Free-form meta information.
pub type Meta = Map<String, Value>;

/// Links object keyed by relation name.
pub type Links = BTreeMap<String, Link>;

/// Errors raised while decoding a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid document structure: {0}")]
    Invalid(&'static str),
}

/// A JSON:API top-level document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Document {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorObject>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Decode and validate a document from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        let document: Document = serde_json::from_slice(bytes)?;
        document.validate()?;
        Ok(document)
    }

    /// Check the top-level member rules.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.data.is_none() && self.errors.is_none() && self.meta.is_none() {
            return Err(DocumentError::Invalid(
                "document must contain at least one of data, errors or meta",
            ));
        }
        if self.data.is_some() && self.errors.is_some() {
            return Err(DocumentError::Invalid("data and errors must not coexist"));
        }
        if !self.included.is_empty() && self.data.is_none() {
            return Err(DocumentError::Invalid("included requires data"));
        }
        Ok(())
    }

    /// Document carrying only the given errors.
    pub fn from_errors(errors: Vec<ErrorObject>) -> Self {
        Self {
            errors: Some(errors),
            ..Default::default()
        }
    }
}

/// Primary data: a single resource (possibly null) or a collection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Option<Box<Resource>>),
}

/// A resource object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Client-local identifier, used on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Relationship>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A relationship object with optional resource linkage.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Relationship {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub data: Option<Linkage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Resource linkage: to-one (possibly null) or to-many.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    Many(Vec<ResourceIdentifier>),
    One(Option<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// A link: bare URL, link object, or null.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Link {
    Url(String),
    Object(LinkObject),
    Null,
}

/// A link object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinkObject {
    pub href: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub describedby: Option<Box<Link>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Media type of the link target.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    /// A language tag or an array of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hreflang: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An error object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    /// HTTP status code, as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl ErrorObject {
    /// Error object for an HTTP status, titled with its canonical reason.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status: Some(status.as_u16().to_string()),
            title: status.canonical_reason().map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

/// The `jsonapi` member describing the server implementation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct JsonApiObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

// Keeps an explicit `null` as `Some(..)` so it stays distinct from a missing member.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
