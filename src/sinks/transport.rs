//! HTTP transport used by the Discord sink
//!
//! The sink only needs "POST this JSON, tell me the status and body", so the
//! HTTP client sits behind [`WebhookTransport`]. Production code uses
//! [`HttpsTransport`] (hyper + rustls); tests substitute a scripted one.

use crate::core::{LoggerError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// Status and body of a webhook response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Send one POST with a JSON body
    ///
    /// Returns `Err` only when no HTTP response was obtained.
    async fn post_json(&self, url: &str, body: String) -> Result<WebhookResponse>;
}

/// hyper client over rustls, trusting the platform's root certificates
#[derive(Clone)]
pub struct HttpsTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HttpsTransport {
    pub fn new() -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| LoggerError::transport(format!("loading root certificates: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpsTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<WebhookResponse> {
        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri(url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(
                http::header::USER_AGENT,
                concat!("unified_logger/", env!("CARGO_PKG_VERSION")),
            )
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| LoggerError::transport(format!("building request: {}", e)))?;

        let response: http::Response<hyper::body::Incoming> = self
            .client
            .request(request)
            .await
            .map_err(|e| LoggerError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| LoggerError::transport(format!("reading response body: {}", e)))?
            .to_bytes();

        Ok(WebhookResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
