//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all JSON:API handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Classify requests and dispatch them to the proxy handler
//! - Serve with graceful shutdown

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{self, UuidRequestId};
use crate::jsonapi::TranslatedResponse;
use crate::proxy::ProxyHandler;
use crate::routing::Classifier;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: ProxyHandler,
    pub classifier: Arc<Classifier>,
}

/// HTTP server fronting the JSON:API backend.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    pub fn new(config: ProxyConfig, handler: ProxyHandler) -> Self {
        let state = AppState {
            handler,
            classifier: Arc::new(Classifier::new(&config.routing.path_prefix)),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request::request_span))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Classifies the request and forwards it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let ctx = match state
        .classifier
        .classify(request.method(), request.uri().path())
    {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::debug!(error = %e, "Request did not match a JSON:API endpoint");
            return TranslatedResponse::error(e.status(), e.to_string()).into_response();
        }
    };

    tracing::debug!(
        operation = %ctx.kind,
        resource_type = %ctx.resource_type,
        "Classified request"
    );

    state.handler.forward(&ctx, request).await.into_response()
}
