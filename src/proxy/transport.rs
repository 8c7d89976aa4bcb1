//! Outbound transport capability.
//!
//! # Responsibilities
//! - Execute a single outbound request and return the raw response
//! - Own connect and request timeouts
//!
//! # Design Decisions
//! - One trait method; production clients and test doubles both implement it
//! - No retries, no pooling policy beyond what the client library does itself
//! - `HyperTransport` speaks plain HTTP/1.1; `ReqwestTransport` covers HTTPS

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, Version},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("upstream request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("upstream request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Other(String),
}

/// Anything that can execute an outbound HTTP request.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, TransportError>;
}

/// hyper-util legacy client over plain TCP.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    timeout: Option<Duration>,
}

impl HyperTransport {
    pub fn new() -> Self {
        Self::with_timeouts(None, None)
    }

    /// `connect` bounds connection setup, `request` bounds the call up to response headers.
    pub fn with_timeouts(connect: Option<Duration>, request: Option<Duration>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(connect);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            timeout: request,
        }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn execute(&self, mut request: Request<Body>) -> Result<Response<Body>, TransportError> {
        // The pooled client negotiates HTTP/1.1 with backends regardless of the inbound version.
        *request.version_mut() = Version::HTTP_11;

        let call = self.client.request(request);
        let response: Response<Incoming> = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => call.await?,
        };

        Ok(response.map(Body::new))
    }
}

/// reqwest client, for backends behind TLS.
///
/// Request and response bodies are buffered in memory.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeouts(
        connect: Option<Duration>,
        request: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(connect) = connect {
            builder = builder.connect_timeout(connect);
        }
        if let Some(request) = request {
            builder = builder.timeout(request);
        }
        Ok(Self::new(builder.build()?))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| TransportError::Other(format!("failed to buffer request body: {e}")))?;

        let upstream = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let headers = upstream.headers().clone();
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
