//! Content type classification for response bodies.

use crate::models::{header_value, Headers};

/// How a response body should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Xml,
    Html,
    PlainText,
    Image,
    Binary,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Json => "JSON",
            ContentType::Xml => "XML",
            ContentType::Html => "HTML",
            ContentType::PlainText => "Plain Text",
            ContentType::Image => "Image",
            ContentType::Binary => "Binary",
        }
    }

    /// Whether the body can be shown as text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            ContentType::Json | ContentType::Xml | ContentType::Html | ContentType::PlainText
        )
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifies a body from its `Content-Type` header, falling back to
/// looking at the bytes when the header is missing or unrecognised.
pub fn detect_content_type(headers: &Headers, body: &[u8]) -> ContentType {
    if let Some(header) = header_value(headers, "content-type") {
        let header = header.to_ascii_lowercase();
        let mime = header.split(';').next().unwrap_or_default().trim();

        if mime.contains("json") {
            return ContentType::Json;
        } else if mime.contains("xml") {
            return ContentType::Xml;
        } else if mime.contains("html") {
            return ContentType::Html;
        } else if mime.starts_with("text/") {
            return ContentType::PlainText;
        } else if mime.starts_with("image/") {
            return ContentType::Image;
        } else if mime == "application/octet-stream"
            || mime.contains("pdf")
            || mime.contains("zip")
            || mime.contains("gzip")
        {
            return ContentType::Binary;
        }
    }

    inspect_body(body)
}

fn inspect_body(body: &[u8]) -> ContentType {
    if let Ok(text) = std::str::from_utf8(body) {
        let trimmed = text.trim();

        if (trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.starts_with('[') && trimmed.ends_with(']'))
        {
            return ContentType::Json;
        }

        let lower = trimmed.get(..14).unwrap_or(trimmed).to_ascii_lowercase();
        if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
            return ContentType::Html;
        }
        if trimmed.starts_with("<?xml") {
            return ContentType::Xml;
        }

        return ContentType::PlainText;
    }

    if is_image_signature(body) {
        ContentType::Image
    } else {
        ContentType::Binary
    }
}

// PNG, JPEG, GIF
fn is_image_signature(body: &[u8]) -> bool {
    body.starts_with(&[0x89, 0x50, 0x4E, 0x47])
        || body.starts_with(&[0xFF, 0xD8, 0xFF])
        || body.starts_with(b"GIF8")
}
