//! Forwarding pipeline.
//!
//! # Responsibilities
//! - Resolve the target URL for a classified request
//! - Rewrite the request target and execute it through the transport
//! - Translate the backend response into a `TranslatedResponse`
//!
//! # Design Decisions
//! - The outbound call runs in its own task; dropping the inbound future
//!   does not abort a call already in flight
//! - Multi-valued backend headers keep only their first value
//! - Every failure becomes a 500 response carrying the cause

use axum::{
    body::Body,
    http::Request,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::jsonapi::{AccessContext, Document, TranslatedResponse};
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::resolver::{self, DefaultUrlResolver, UrlResolver};
use crate::proxy::transport::{HyperTransport, Transport};

/// Forwards JSON:API requests to the backend at `base_url`.
///
/// Immutable once built; clone it to share between tasks.
#[derive(Clone)]
pub struct ProxyHandler {
    resolver: Arc<dyn UrlResolver>,
    base_url: String,
    transport: Arc<dyn Transport>,
    forward_query: bool,
    max_response_bytes: usize,
}

impl ProxyHandler {
    /// Handler with the default URL convention and a plain HTTP transport.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder(base_url).build()
    }

    pub fn builder(base_url: impl Into<String>) -> ProxyHandlerBuilder {
        ProxyHandlerBuilder {
            base_url: base_url.into(),
            resolver: None,
            transport: None,
            forward_query: false,
            max_response_bytes: usize::MAX,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward the request, turning any failure into an internal-error response.
    pub async fn forward(&self, ctx: &AccessContext, request: Request<Body>) -> TranslatedResponse {
        let start = Instant::now();

        match self.try_forward(ctx, request).await {
            Ok(response) => {
                metrics::record_forward(ctx.kind, response.status.as_u16(), start);
                response
            }
            Err(e) => {
                tracing::warn!(
                    operation = %ctx.kind,
                    resource_type = %ctx.resource_type,
                    stage = e.stage(),
                    error = %e,
                    "Forwarding failed"
                );
                metrics::record_failure(ctx.kind, e.stage(), start);
                TranslatedResponse::internal_error(e)
            }
        }
    }

    /// Forward the request, returning the failure as an error value.
    pub async fn try_forward(
        &self,
        ctx: &AccessContext,
        request: Request<Body>,
    ) -> Result<TranslatedResponse, ProxyError> {
        let mut url = resolver::resolve(self.resolver.as_ref(), ctx, &self.base_url)?;

        let (mut parts, body) = request.into_parts();
        if self.forward_query && url.query().is_none() {
            if let Some(query) = parts.uri.query() {
                url.set_query(Some(query));
            }
        }
        parts.uri = resolver::to_uri(&url)?;
        let outbound = Request::from_parts(parts, body);

        tracing::debug!(
            operation = %ctx.kind,
            method = %outbound.method(),
            target = %outbound.uri(),
            "Forwarding request"
        );

        // Detached from the caller: the task completes even if this future is dropped.
        let transport = Arc::clone(&self.transport);
        let limit = self.max_response_bytes;
        let call = tokio::spawn(async move {
            let response = transport.execute(outbound).await?;
            let (parts, body) = response.into_parts();
            let bytes = axum::body::to_bytes(body, limit)
                .await
                .map_err(ProxyError::BodyRead)?;
            Ok::<_, ProxyError>((parts, bytes))
        });
        let (parts, bytes) = call.await??;

        let mut response = TranslatedResponse::new(parts.status);
        for name in parts.headers.keys() {
            // `get` yields the first value of a multi-valued header.
            if let Some(value) = parts.headers.get(name) {
                response.headers.insert(name.clone(), value.clone());
            }
        }

        if !bytes.is_empty() {
            response.body = Some(Document::from_slice(&bytes)?);
        }

        Ok(response)
    }
}

impl fmt::Debug for ProxyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandler")
            .field("base_url", &self.base_url)
            .field("forward_query", &self.forward_query)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish_non_exhaustive()
    }
}

/// Builder for `ProxyHandler`; overrides apply before the handler is shared.
pub struct ProxyHandlerBuilder {
    base_url: String,
    resolver: Option<Arc<dyn UrlResolver>>,
    transport: Option<Arc<dyn Transport>>,
    forward_query: bool,
    max_response_bytes: usize,
}

impl ProxyHandlerBuilder {
    /// Replace the default URL convention entirely.
    pub fn resolver<R: UrlResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Append the inbound query string when the resolved URL has none.
    pub fn forward_query(mut self, enabled: bool) -> Self {
        self.forward_query = enabled;
        self
    }

    /// Upper bound on the backend body read into memory.
    pub fn max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub fn build(self) -> ProxyHandler {
        ProxyHandler {
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(DefaultUrlResolver)),
            base_url: self.base_url,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HyperTransport::new())),
            forward_query: self.forward_query,
            max_response_bytes: self.max_response_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonapi::PrimaryData;
    use crate::proxy::TransportError;
    use async_trait::async_trait;
    use axum::http::{header, HeaderValue, Method, Response, StatusCode, Uri};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    type Reply = fn() -> Result<Response<Body>, TransportError>;

    /// Records every outbound request and answers with a canned reply.
    #[derive(Clone)]
    struct MockTransport {
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<(Method, Uri, Option<HeaderValue>)>>>,
        reply: Reply,
    }

    impl MockTransport {
        fn new(reply: Reply) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
                reply,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_uri(&self) -> Uri {
            self.seen.lock().unwrap().last().unwrap().1.clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                request.method().clone(),
                request.uri().clone(),
                request.headers().get("x-client").cloned(),
            ));
            (self.reply)()
        }
    }

    fn ok_widget() -> Result<Response<Body>, TransportError> {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/vnd.api+json")
            .body(Body::from(r#"{"data":{"type":"widgets","id":"42"}}"#))
            .unwrap())
    }

    fn inbound(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-client", "test")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_forward_success() {
        let transport = MockTransport::new(ok_widget);
        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(transport.clone())
            .build();

        let ctx = AccessContext::fetch("widgets", "42");
        let response = handler.forward(&ctx, inbound(Method::GET, "/widgets/42")).await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(!response.is_internal_error());
        assert!(matches!(response.body.unwrap().data, Some(PrimaryData::One(Some(_)))));

        let (method, uri, client_header) = transport.seen.lock().unwrap()[0].clone();
        assert_eq!(method, Method::GET);
        assert_eq!(uri, "http://backend:3000/widgets/42");
        assert_eq!(client_header.unwrap(), "test");
    }

    #[tokio::test]
    async fn test_resolver_override_replaces_default() {
        let transport = MockTransport::new(ok_widget);
        let handler = ProxyHandler::builder("http://backend:3000")
            .resolver(|ctx: &AccessContext, base: &str| {
                format!("{}/custom/{}", base, ctx.kind)
            })
            .transport(transport.clone())
            .build();

        let ctx = AccessContext::fetch("widgets", "42");
        handler.forward(&ctx, inbound(Method::GET, "/widgets/42")).await;

        assert_eq!(transport.last_uri(), "http://backend:3000/custom/fetch");
    }

    #[tokio::test]
    async fn test_query_dropped_by_default() {
        let transport = MockTransport::new(ok_widget);
        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(transport.clone())
            .build();

        let ctx = AccessContext::search("widgets");
        handler.forward(&ctx, inbound(Method::GET, "/widgets?page=2")).await;

        assert_eq!(transport.last_uri().query(), None);
    }

    #[tokio::test]
    async fn test_forward_query_when_enabled() {
        let transport = MockTransport::new(ok_widget);
        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(transport.clone())
            .forward_query(true)
            .build();

        let ctx = AccessContext::search("widgets");
        handler.forward(&ctx, inbound(Method::GET, "/widgets?page=2&sort=name")).await;

        assert_eq!(transport.last_uri().query(), Some("page=2&sort=name"));
    }

    #[tokio::test]
    async fn test_first_header_value_wins() {
        let transport = MockTransport::new(|| {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::OK;
            response.headers_mut().append("x-test", HeaderValue::from_static("a"));
            response.headers_mut().append("x-test", HeaderValue::from_static("b"));
            Ok(response)
        });
        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(transport)
            .build();

        let response = handler
            .forward(&AccessContext::search("widgets"), inbound(Method::GET, "/widgets"))
            .await;

        let values: Vec<_> = response
            .headers
            .get_all("x-test")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a"]);
    }

    #[tokio::test]
    async fn test_empty_body_has_no_document() {
        let transport = MockTransport::new(|| {
            Ok(Response::builder()
                .status(StatusCode::NO_CONTENT)
                .body(Body::empty())
                .unwrap())
        });
        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(transport)
            .build();

        let response = handler
            .forward(&AccessContext::delete("widgets", "42"), inbound(Method::DELETE, "/widgets/42"))
            .await;

        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(response.body.is_none());
        assert!(!response.is_internal_error());
    }

    #[tokio::test]
    async fn test_malformed_body_is_internal_error() {
        let transport = MockTransport::new(|| {
            Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Body::from("<html>not json</html>"))
                .unwrap())
        });
        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(transport)
            .build();

        let response = handler
            .forward(&AccessContext::fetch("widgets", "42"), inbound(Method::GET, "/widgets/42"))
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(response.cause, Some(ProxyError::Decode(_))));
        let document = response.body.unwrap();
        assert!(document.data.is_none());
        assert_eq!(document.errors.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let transport =
            MockTransport::new(|| Err(TransportError::Other("connection refused".into())));
        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(transport.clone())
            .build();

        let response = handler
            .forward(&AccessContext::create("widgets"), inbound(Method::POST, "/widgets"))
            .await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(response.cause, Some(ProxyError::Transport(_))));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_resolved_url_never_forwards() {
        let transport = MockTransport::new(ok_widget);
        let handler = ProxyHandler::builder("not a base url")
            .transport(transport.clone())
            .build();

        let result = handler
            .try_forward(&AccessContext::search("widgets"), inbound(Method::GET, "/widgets"))
            .await;

        assert!(matches!(result, Err(ProxyError::Resolution { .. })));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_dot_segment_id_never_forwards() {
        let transport = MockTransport::new(ok_widget);
        let handler = ProxyHandler::builder("http://backend:3000/api/v1")
            .transport(transport.clone())
            .build();

        let result = handler
            .try_forward(
                &AccessContext::delete("widgets", ".."),
                inbound(Method::DELETE, "/widgets/.."),
            )
            .await;

        assert!(matches!(result, Err(ProxyError::Resolution { .. })));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_read_error() {
        let transport = MockTransport::new(ok_widget);
        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(transport)
            .max_response_bytes(8)
            .build();

        let result = handler
            .try_forward(&AccessContext::fetch("widgets", "42"), inbound(Method::GET, "/widgets/42"))
            .await;

        assert!(matches!(result, Err(ProxyError::BodyRead(_))));
    }

    /// Blocks inside `execute` until released.
    struct GatedTransport {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        completed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn execute(&self, _request: Request<Body>) -> Result<Response<Body>, TransportError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.completed.store(true, Ordering::SeqCst);
            Ok(Response::builder()
                .status(StatusCode::CREATED)
                .body(Body::from(r#"{"data":{"type":"widgets","id":"1"}}"#))
                .unwrap())
        }
    }

    #[tokio::test]
    async fn test_outbound_call_survives_inbound_cancellation() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let completed = Arc::new(AtomicBool::new(false));

        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(GatedTransport {
                entered: entered.clone(),
                release: release.clone(),
                completed: completed.clone(),
            })
            .build();

        let inbound_task = tokio::spawn(async move {
            handler
                .forward(&AccessContext::create("widgets"), inbound(Method::POST, "/widgets"))
                .await
        });

        // Cancel the inbound side once the outbound call is in flight.
        entered.notified().await;
        inbound_task.abort();
        assert!(inbound_task.await.unwrap_err().is_cancelled());
        assert!(!completed.load(Ordering::SeqCst));

        release.notify_one();
        tokio::time::timeout(Duration::from_secs(1), async {
            while !completed.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("outbound call should finish after the inbound side is cancelled");
    }

    #[tokio::test]
    async fn test_gated_call_completes_normally() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let completed = Arc::new(AtomicBool::new(false));

        let handler = ProxyHandler::builder("http://backend:3000")
            .transport(GatedTransport {
                entered: entered.clone(),
                release: release.clone(),
                completed: completed.clone(),
            })
            .build();

        release.notify_one();
        let response = handler
            .forward(&AccessContext::create("widgets"), inbound(Method::POST, "/widgets"))
            .await;

        assert_eq!(response.status, StatusCode::CREATED);
        assert!(completed.load(Ordering::SeqCst));
    }
}
