//! Request templates.
//!
//! A template is a named, reusable request definition. Its method, URL,
//! header values and body may contain `${NAME}` placeholders, and its
//! captures describe which response values to store after a send.

use super::encoding;
use super::request::{remove_header, Headers};
use crate::auth::AuthConfig;
use crate::variables::{normalize_name, VarScraper};
use serde::{Deserialize, Serialize};

/// A named HTTP request definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestTemplate {
    /// Template name; unique within a project, compared case-insensitively.
    pub name: String,

    /// HTTP method, possibly containing placeholders.
    #[serde(default)]
    pub method: String,

    /// Target URL, possibly containing placeholders.
    #[serde(default)]
    pub url: String,

    /// Header multi-map; values may contain placeholders.
    #[serde(default)]
    pub headers: Headers,

    /// Optional body bytes.
    #[serde(
        default,
        with = "encoding::optional_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<Vec<u8>>,

    /// Response captures, at most one per variable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<VarScraper>,

    /// Authentication applied when the template is sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

impl RequestTemplate {
    /// Creates an empty template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates a template with a method and URL.
    pub fn with_target(
        name: impl Into<String>,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// A template can only be sent once both its method and URL are set.
    pub fn is_sendable(&self) -> bool {
        !self.method.trim().is_empty() && !self.url.trim().is_empty()
    }

    /// Appends a header value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.entry(name.into()).or_default().push(value.into());
    }

    /// Removes all values of a header, matching its name case-insensitively.
    pub fn remove_header(&mut self, name: &str) -> bool {
        remove_header(&mut self.headers, name)
    }

    /// Adds a capture, replacing any existing capture for the same variable.
    pub fn set_capture(&mut self, scraper: VarScraper) {
        match self.captures.iter_mut().find(|c| c.name == scraper.name) {
            Some(existing) => *existing = scraper,
            None => self.captures.push(scraper),
        }
    }

    /// Removes the capture for a variable.
    pub fn remove_capture(&mut self, var_name: &str) -> bool {
        let name = normalize_name(var_name);
        let before = self.captures.len();
        self.captures.retain(|c| c.name != name);
        self.captures.len() != before
    }

    /// Capture for a variable, if any.
    pub fn capture(&self, var_name: &str) -> Option<&VarScraper> {
        let name = normalize_name(var_name);
        self.captures.iter().find(|c| c.name == name)
    }
}
