//! HTTP transport.
//!
//! [`Transport`] is the seam between request preparation and the network.
//! [`ReqwestTransport`] sends requests with the blocking `reqwest` client;
//! tests substitute scripted transports.

use super::config::ExecutionConfig;
use super::error::RequestError;
use crate::models::{HttpRequest, HttpResponse};
use crate::session::RecordingJar;
use std::sync::Arc;
use std::time::Instant;

/// Sends a fully resolved request and returns the complete response.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError>;
}

/// Transport backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Builds a client with the configured timeout.
    ///
    /// When a jar is given, `Set-Cookie` responses are recorded into it and
    /// matching cookies are sent with later requests.
    pub fn new(
        config: &ExecutionConfig,
        jar: Option<Arc<RecordingJar>>,
    ) -> Result<Self, RequestError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(config.timeout_duration())
            .user_agent(concat!("restflow/", env!("CARGO_PKG_VERSION")));

        if let Some(jar) = jar {
            builder = builder.cookie_provider(jar);
        }

        let client = builder
            .build()
            .map_err(|e| RequestError::BuildError(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        validate_url(&request.url)?;

        let method = reqwest::Method::from_bytes(request.method.trim().to_uppercase().as_bytes())
            .map_err(|_| RequestError::InvalidMethod(request.method.clone()))?;

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let start_time = Instant::now();
        let response = builder.send()?;

        let status = response.status();
        let mut http_response = HttpResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
        );
        for (name, value) in response.headers() {
            http_response.add_header(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }

        http_response.body = response.bytes()?.to_vec();
        http_response.duration = start_time.elapsed();

        log::debug!(
            "Received {} ({} bytes) in {:?}",
            http_response.status_code,
            http_response.size(),
            http_response.duration
        );

        Ok(http_response)
    }
}

/// Validates that the URL is well-formed and uses a supported protocol.
pub fn validate_url(url: &str) -> Result<(), RequestError> {
    let parsed = url::Url::parse(url)?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(RequestError::UnsupportedProtocol(format!(
            "Only HTTP and HTTPS are supported, got: {}",
            scheme
        )));
    }

    Ok(())
}
