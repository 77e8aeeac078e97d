//! Basic HTTP authentication (RFC 7617).

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encodes username and password into a Basic authentication header value.
///
/// # Examples
///
/// ```
/// use rest_flow::auth::basic::basic_auth;
///
/// let auth_header = basic_auth("user", "pass123");
/// assert_eq!(auth_header, "Basic dXNlcjpwYXNzMTIz");
/// ```
pub fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
}

/// Decodes a Basic header value back into `(username, password)`.
///
/// Used when showing a stored request, so the user name can be displayed
/// without the password. Returns `None` for anything that is not a
/// well-formed Basic value.
pub fn parse_basic_auth_header(header: &str) -> Option<(String, String)> {
    let encoded = header.trim().strip_prefix("Basic ")?.trim();
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
