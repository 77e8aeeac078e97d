//! Data models for request history.

use crate::models::{HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum response body size to store in history (1MB).
///
/// Responses larger than this threshold will have their body excluded
/// to prevent excessive storage usage.
pub const MAX_RESPONSE_BODY_SIZE: usize = 1_048_576;

/// Sensitive header names that are removed before storage.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "api-key",
    "auth-token",
    "x-auth-token",
    "access-token",
    "x-access-token",
    "proxy-authorization",
];

/// A single sent request and its response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// When the request was sent, in UTC.
    pub timestamp: DateTime<Utc>,

    /// Template the request was built from.
    pub template: String,

    /// Flow the send was part of, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    /// The request as sent.
    pub request: HttpRequest,

    /// The response received.
    pub response: HttpResponse,
}

impl HistoryEntry {
    /// Creates an entry with a fresh id and the current time.
    pub fn new(template: impl Into<String>, request: HttpRequest, response: HttpResponse) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            template: template.into(),
            flow: None,
            request,
            response,
        }
    }

    /// Marks the entry as part of a flow run.
    pub fn in_flow(mut self, flow: impl Into<String>) -> Self {
        self.flow = Some(flow.into());
        self
    }

    /// Checks if the response body exceeds the storage limit.
    pub fn has_large_response(&self) -> bool {
        self.response.body.len() > MAX_RESPONSE_BODY_SIZE
    }

    /// Removes sensitive headers from both the request and the response.
    pub fn sanitize_headers(mut self) -> Self {
        let is_sensitive = |key: &String| {
            SENSITIVE_HEADERS
                .iter()
                .any(|sensitive| key.eq_ignore_ascii_case(sensitive))
        };

        self.request.headers.retain(|key, _| !is_sensitive(key));
        self.response.headers.retain(|key, _| !is_sensitive(key));
        self
    }

    /// Drops the response body if it exceeds the size limit.
    pub fn truncate_large_response(mut self) -> Self {
        if self.has_large_response() {
            self.response.body = Vec::new();
        }
        self
    }

    /// Sanitizes and truncates the entry for storage.
    pub fn prepare_for_storage(self) -> Self {
        self.sanitize_headers().truncate_large_response()
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {:<16} {} {} -> {} {} ({} ms)",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.template,
            self.request.method,
            self.request.url,
            self.response.status_code,
            self.response.status_text,
            self.response.duration.as_millis()
        )?;
        if let Some(flow) = &self.flow {
            write!(f, " [flow {}]", flow)?;
        }
        Ok(())
    }
}

/// Errors that can occur during history operations.
#[derive(Debug)]
pub enum HistoryError {
    /// Error occurred during storage operations (file I/O).
    StorageError(std::io::Error),

    /// Error occurred during serialization or deserialization.
    SerializationError(serde_json::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::StorageError(err) => write!(f, "History storage error: {}", err),
            HistoryError::SerializationError(err) => {
                write!(f, "History serialization error: {}", err)
            }
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HistoryError::StorageError(err) => Some(err),
            HistoryError::SerializationError(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for HistoryError {
    fn from(err: std::io::Error) -> Self {
        HistoryError::StorageError(err)
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::SerializationError(err)
    }
}
