//! Upstream URL resolution.
//!
//! # Responsibilities
//! - Map an AccessContext and base URL to the backend target URL
//! - Provide the default JSON:API URL convention
//! - Reject results that are not absolute URLs, or whose path the URL
//!   parser would rewrite through dot-segment removal
//!
//! # Design Decisions
//! - Strategies are pure and see the context by shared reference only
//! - Any `Fn(&AccessContext, &str) -> String` is a strategy
//! - Absent id or relationship segments are omitted, never rendered empty

use axum::http::Uri;
use url::Url;

use crate::jsonapi::{AccessContext, OperationKind};
use crate::proxy::ProxyError;

/// Strategy mapping an access context to a target URL string.
pub trait UrlResolver: Send + Sync {
    fn resolve_url(&self, ctx: &AccessContext, base_url: &str) -> String;
}

impl<F> UrlResolver for F
where
    F: Fn(&AccessContext, &str) -> String + Send + Sync,
{
    fn resolve_url(&self, ctx: &AccessContext, base_url: &str) -> String {
        self(ctx, base_url)
    }
}

/// The conventional JSON:API URL layout.
///
/// ```text
/// search, create          {base}/{type}
/// fetch, update, delete   {base}/{type}/{id}
/// fetchRef                {base}/{type}/{id}/relationships/{ref}
/// fetchRelated            {base}/{type}/{id}/{ref}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultUrlResolver;

impl UrlResolver for DefaultUrlResolver {
    fn resolve_url(&self, ctx: &AccessContext, base_url: &str) -> String {
        let mut url = base_url.trim_end_matches('/').to_string();
        push_segment(&mut url, Some(&ctx.resource_type));

        match ctx.kind {
            OperationKind::Search | OperationKind::Create => {}
            OperationKind::Fetch | OperationKind::Update | OperationKind::Delete => {
                push_segment(&mut url, ctx.id.as_deref());
            }
            OperationKind::FetchRef => {
                push_segment(&mut url, ctx.id.as_deref());
                push_segment(&mut url, Some("relationships"));
                push_segment(&mut url, ctx.relationship.as_deref());
            }
            OperationKind::FetchRelated => {
                push_segment(&mut url, ctx.id.as_deref());
                push_segment(&mut url, ctx.relationship.as_deref());
            }
        }

        url
    }
}

fn push_segment(url: &mut String, segment: Option<&str>) {
    if let Some(segment) = segment {
        url.push('/');
        url.push_str(segment);
    }
}

/// Run the strategy and parse its output as an absolute URL.
pub fn resolve(
    resolver: &dyn UrlResolver,
    ctx: &AccessContext,
    base_url: &str,
) -> Result<Url, ProxyError> {
    let raw = resolver.resolve_url(ctx, base_url);
    let url = Url::parse(&raw).map_err(|e| ProxyError::Resolution {
        url: raw.clone(),
        reason: e.to_string(),
    })?;

    if !url.has_host() {
        return Err(ProxyError::Resolution {
            url: raw,
            reason: "URL has no host".to_string(),
        });
    }

    if raw_path(&raw).split('/').any(is_dot_segment) {
        return Err(ProxyError::Resolution {
            url: raw,
            reason: "path contains '.' or '..' segments".to_string(),
        });
    }

    Ok(url)
}

/// Whether `segment` is `.` or `..`, literally or percent-encoded.
pub fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

// Path of an absolute URL string as written, before any normalization.
fn raw_path(raw: &str) -> &str {
    let without_query = raw.split(['?', '#']).next().unwrap_or(raw);
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    after_scheme.find('/').map_or("", |i| &after_scheme[i..])
}

/// Convert a resolved URL into a request target.
pub fn to_uri(url: &Url) -> Result<Uri, ProxyError> {
    url.as_str()
        .parse::<Uri>()
        .map_err(|e| ProxyError::Resolution {
            url: url.to_string(),
            reason: e.to_string(),
        })
}
