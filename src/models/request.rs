//! HTTP request data models.
//!
//! A [`HttpRequest`] is a fully resolved request, produced from a template
//! after substitution and ready to hand to a transport.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header multi-map: header name to its values, in the order they were added.
pub type Headers = BTreeMap<String, Vec<String>>;

/// Looks up the first value of a header, ignoring the case of its name.
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

/// Removes every header whose name matches case-insensitively.
pub fn remove_header(headers: &mut Headers, name: &str) -> bool {
    let before = headers.len();
    headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    headers.len() != before
}

/// A request ready to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP method, e.g. `GET`.
    pub method: String,

    /// Target URL.
    pub url: String,

    /// Request headers.
    #[serde(default)]
    pub headers: Headers,

    /// Optional request body.
    #[serde(
        default,
        with = "super::encoding::optional_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a new request with no headers and no body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Appends a header value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.entry(name.into()).or_default().push(value.into());
    }

    /// Replaces all values of a header (matched case-insensitively) with one value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        remove_header(&mut self.headers, name);
        self.add_header(name, value);
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// Checks if the request has a non-empty body.
    pub fn has_body(&self) -> bool {
        self.body.as_ref().map_or(false, |b| !b.is_empty())
    }
}
