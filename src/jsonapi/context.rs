//! Per-request access context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The logical JSON:API operation a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    /// `GET /{type}`
    Search,
    /// `POST /{type}`
    Create,
    /// `GET /{type}/{id}`
    Fetch,
    /// `PATCH /{type}/{id}`
    Update,
    /// `DELETE /{type}/{id}`
    Delete,
    /// `GET /{type}/{id}/relationships/{ref}`
    FetchRef,
    /// `GET /{type}/{id}/{ref}`
    FetchRelated,
}

impl OperationKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Search => "search",
            OperationKind::Create => "create",
            OperationKind::Fetch => "fetch",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::FetchRef => "fetchRef",
            OperationKind::FetchRelated => "fetchRelated",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified description of the resource operation behind a request.
///
/// Built once per inbound request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub resource_type: String,
    pub id: Option<String>,
    pub relationship: Option<String>,
    pub kind: OperationKind,
}

impl AccessContext {
    fn new(
        kind: OperationKind,
        resource_type: impl Into<String>,
        id: Option<String>,
        relationship: Option<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
            relationship,
            kind,
        }
    }

    pub fn search(resource_type: impl Into<String>) -> Self {
        Self::new(OperationKind::Search, resource_type, None, None)
    }

    pub fn create(resource_type: impl Into<String>) -> Self {
        Self::new(OperationKind::Create, resource_type, None, None)
    }

    pub fn fetch(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(OperationKind::Fetch, resource_type, Some(id.into()), None)
    }

    pub fn update(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(OperationKind::Update, resource_type, Some(id.into()), None)
    }

    pub fn delete(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(OperationKind::Delete, resource_type, Some(id.into()), None)
    }

    pub fn fetch_ref(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self::new(
            OperationKind::FetchRef,
            resource_type,
            Some(id.into()),
            Some(relationship.into()),
        )
    }

    pub fn fetch_related(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self::new(
            OperationKind::FetchRelated,
            resource_type,
            Some(id.into()),
            Some(relationship.into()),
        )
    }
}
