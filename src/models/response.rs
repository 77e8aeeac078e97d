//! HTTP response data models.

use super::encoding;
use super::request::{header_value, Headers};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Represents an HTTP response received from a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status_code: u16,

    /// HTTP status text (e.g., "OK", "Not Found").
    pub status_text: String,

    /// Response headers. `Set-Cookie` and friends may carry several values.
    #[serde(default)]
    pub headers: Headers,

    /// Response body as raw bytes.
    ///
    /// Captures run against these bytes, so they are kept exactly as
    /// received rather than decoded to text.
    #[serde(default, with = "encoding::bytes")]
    pub body: Vec<u8>,

    /// Total request duration from send to the last body byte.
    #[serde(default)]
    pub duration: Duration,
}

impl HttpResponse {
    /// Creates a new HttpResponse with the given status code and text.
    pub fn new(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            headers: Headers::new(),
            body: Vec::new(),
            duration: Duration::from_secs(0),
        }
    }

    /// Checks if the response status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Checks if the response status indicates a redirection (3xx).
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    /// Gets the Content-Type header value if present.
    pub fn content_type(&self) -> Option<&str> {
        header_value(&self.headers, "content-type")
    }

    /// Response body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Appends a header value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.entry(name.into()).or_default().push(value.into());
    }

    /// Sets the response body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Body size in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }
}
