//! Response rendering for the terminal.
//!
//! JSON bodies are pretty-printed, other text is shown as received and
//! binary bodies get a short hex preview.

pub mod content_type;

pub use content_type::{detect_content_type, ContentType};

use crate::models::{Headers, HttpResponse};
use std::fmt::Write;
use std::time::Duration;

/// Bodies longer than this are cut off when rendered (1MB).
const MAX_RENDERED_BODY: usize = 1024 * 1024;

/// Bytes shown in a binary preview.
const HEX_PREVIEW_SIZE: usize = 256;

/// Rendering options.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Print response headers between the status line and the body
    pub show_headers: bool,
}

/// Renders a response as the status line, optional headers, a summary line
/// and the body.
pub fn format_response(response: &HttpResponse, options: FormatOptions) -> String {
    let content_type = detect_content_type(&response.headers, &response.body);
    let mut output = format!("{} {}\n", response.status_code, response.status_text);

    if options.show_headers {
        output.push_str(&format_headers(&response.headers));
    }

    let _ = writeln!(
        output,
        "({} | {} | {})",
        format_duration(response.duration),
        format_size(response.size()),
        content_type
    );

    if response.body.is_empty() {
        return output;
    }
    output.push('\n');

    let truncated = response.body.len() > MAX_RENDERED_BODY;
    let body = &response.body[..response.body.len().min(MAX_RENDERED_BODY)];

    let rendered = match content_type {
        ContentType::Json => format_json(body),
        ContentType::Image | ContentType::Binary => format_binary_preview(body),
        _ => String::from_utf8_lossy(body).into_owned(),
    };
    output.push_str(rendered.trim_end());
    output.push('\n');

    if truncated {
        let _ = writeln!(
            output,
            "... ({} more bytes not shown)",
            response.body.len() - MAX_RENDERED_BODY
        );
    }

    output
}

/// Pretty-prints JSON, or returns the text unchanged if it does not parse.
pub fn format_json(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

/// Formats headers one per line, repeated names once per value.
pub fn format_headers(headers: &Headers) -> String {
    let mut output = String::new();
    for (name, values) in headers {
        for value in values {
            let _ = writeln!(output, "{}: {}", name, value);
        }
    }
    output
}

/// "567ms" or "1.234s".
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

/// "456 B", "1.23 KB" or "4.56 MB".
pub fn format_size(size: usize) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.2} KB", size as f64 / 1024.0)
    } else {
        format!("{:.2} MB", size as f64 / (1024.0 * 1024.0))
    }
}

fn format_binary_preview(body: &[u8]) -> String {
    let preview = &body[..body.len().min(HEX_PREVIEW_SIZE)];
    let mut output = String::from("[binary data]\n");

    for (i, chunk) in preview.chunks(16).enumerate() {
        let _ = write!(output, "{:08x}  ", i * 16);
        for byte in chunk {
            let _ = write!(output, "{:02x} ", byte);
        }
        for _ in chunk.len()..16 {
            output.push_str("   ");
        }

        output.push_str(" |");
        output.extend(chunk.iter().map(|&byte| {
            if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            }
        }));
        output.push_str("|\n");
    }

    if body.len() > HEX_PREVIEW_SIZE {
        let _ = writeln!(output, "... ({} more bytes)", body.len() - HEX_PREVIEW_SIZE);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_response() -> HttpResponse {
        let mut response = HttpResponse::new(200, "OK");
        response.add_header("Content-Type", "application/json");
        response.add_header("Set-Cookie", "a=1");
        response.add_header("Set-Cookie", "b=2");
        response.set_body(r#"{"token":"abc","n":[1,2]}"#);
        response.duration = Duration::from_millis(42);
        response
    }

    #[test]
    fn test_json_body_is_pretty_printed() {
        let output = format_response(&json_response(), FormatOptions::default());

        assert!(output.starts_with("200 OK\n"));
        assert!(output.contains("(42ms | 25 B | JSON)"));
        assert!(output.contains("  \"token\": \"abc\""));
        assert!(!output.contains("Set-Cookie"));
    }

    #[test]
    fn test_headers_shown_on_request() {
        let output = format_response(&json_response(), FormatOptions { show_headers: true });
        assert!(output.contains("Set-Cookie: a=1\nSet-Cookie: b=2\n"));
    }

    #[test]
    fn test_invalid_json_shown_raw() {
        assert_eq!(format_json(b"{not json}"), "{not json}");
    }

    #[test]
    fn test_empty_body() {
        let output = format_response(&HttpResponse::new(204, "No Content"), FormatOptions::default());
        assert_eq!(output, "204 No Content\n(0ms | 0 B | Plain Text)\n");
    }

    #[test]
    fn test_binary_preview() {
        let mut response = HttpResponse::new(200, "OK");
        response.set_body(vec![0u8, 159, 146, 150, b'A']);
        let output = format_response(&response, FormatOptions::default());

        assert!(output.contains("[binary data]"));
        assert!(output.contains("00 9f 92 96 41"));
        assert!(output.contains("|....A|"));
    }

    #[test]
    fn test_sizes_and_durations() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
    }
}
