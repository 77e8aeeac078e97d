//! Request execution error types.
//!
//! [`RequestError`] covers the transport itself: network failures, timeouts
//! and requests that cannot be built. [`SendError`] wraps everything that can
//! go wrong while turning a template into a sent request.

use crate::auth::AuthError;
use crate::variables::{CaptureFailure, VarError};
use std::fmt;

/// Errors that can occur while the transport executes a request.
#[derive(Debug)]
pub enum RequestError {
    /// Network error occurred during request execution.
    ///
    /// This includes connection failures, DNS resolution errors,
    /// and other network-level issues.
    NetworkError(String),

    /// Request timed out before completion.
    Timeout,

    /// Invalid URL provided in the request.
    InvalidUrl(String),

    /// The method string is not a valid HTTP token.
    InvalidMethod(String),

    /// Request building error, such as a header that is not valid HTTP.
    BuildError(String),

    /// Only HTTP and HTTPS URLs can be sent.
    UnsupportedProtocol(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            RequestError::Timeout => write!(f, "Request timed out"),
            RequestError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            RequestError::InvalidMethod(method) => write!(f, "Invalid HTTP method: {}", method),
            RequestError::BuildError(msg) => write!(f, "Request build error: {}", msg),
            RequestError::UnsupportedProtocol(protocol) => {
                write!(f, "Unsupported protocol: {}", protocol)
            }
        }
    }
}

impl std::error::Error for RequestError {}

/// Convert reqwest errors to RequestError.
impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_builder() {
            RequestError::BuildError(err.to_string())
        } else {
            RequestError::NetworkError(err.to_string())
        }
    }
}

/// Convert URL parsing errors to RequestError.
impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        RequestError::InvalidUrl(err.to_string())
    }
}

/// Errors from sending a single template.
#[derive(Debug)]
pub enum SendError {
    /// Method or URL is empty
    IncompleteTemplate(String),
    /// A placeholder in `field` could not be resolved; nothing was sent
    Substitution { field: String, source: VarError },
    /// Authentication could not be applied; nothing was sent
    Auth(AuthError),
    /// The transport failed
    Transport(RequestError),
    /// Captures failed under the abort policy
    CaptureFailed(Vec<CaptureFailure>),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::IncompleteTemplate(name) => {
                write!(f, "Request '{}' is incomplete: method and URL are required", name)
            }
            SendError::Substitution { field, source } => {
                write!(f, "Cannot resolve {}: {}", field, source)
            }
            SendError::Auth(err) => write!(f, "Authentication failed: {}", err),
            SendError::Transport(err) => write!(f, "{}", err),
            SendError::CaptureFailed(failures) => {
                write!(f, "{} capture(s) failed", failures.len())?;
                for failure in failures {
                    write!(f, "; {}", failure)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::Substitution { source, .. } => Some(source),
            SendError::Auth(err) => Some(err),
            SendError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RequestError> for SendError {
    fn from(err: RequestError) -> Self {
        SendError::Transport(err)
    }
}

impl From<AuthError> for SendError {
    fn from(err: AuthError) -> Self {
        SendError::Auth(err)
    }
}
