//! HTTP authentication for request templates.
//!
//! A template may carry an [`AuthConfig`]. Basic and Bearer credentials are
//! turned into an `Authorization` header at send time, after their fields
//! have gone through variable substitution. Flow-based schemes such as OAuth2
//! client credentials can be stored but are not executed.

pub mod basic;

use crate::models::HttpRequest;
use crate::variables::{substitute_variables, VarError, VariableContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication configuration attached to a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// HTTP Basic authentication (RFC 7617)
    Basic { username: String, password: String },
    /// Bearer token authentication (RFC 6750)
    Bearer { token: String },
    /// OAuth2 client credentials grant; stored only
    #[serde(rename = "oauth2-client-credentials")]
    OAuth2ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
    },
}

/// Errors that can occur while applying authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// A credential field references an undefined variable
    Unresolved { field: &'static str, source: VarError },
    /// Missing required authentication credentials
    MissingCredentials(String),
    /// Scheme is configured but cannot be applied as a static header
    UnsupportedScheme(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unresolved { field, source } => {
                write!(f, "Cannot resolve auth {}: {}", field, source)
            }
            AuthError::MissingCredentials(msg) => write!(f, "Missing credentials: {}", msg),
            AuthError::UnsupportedScheme(msg) => write!(f, "Unsupported scheme: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Unresolved { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl AuthConfig {
    /// Short scheme name used in listings.
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::OAuth2ClientCredentials { .. } => "oauth2-client-credentials",
        }
    }

    /// Builds the `Authorization` header value, substituting variables in
    /// every credential field first.
    ///
    /// # Examples
    ///
    /// ```
    /// use rest_flow::auth::AuthConfig;
    /// use rest_flow::variables::{VariableContext, VariableStore};
    ///
    /// let mut store = VariableStore::new();
    /// store.set("token", "abc123");
    ///
    /// let auth = AuthConfig::Bearer { token: "${TOKEN}".to_string() };
    /// let header = auth.header_value(&VariableContext::new(&store)).unwrap();
    /// assert_eq!(header, "Bearer abc123");
    /// ```
    pub fn header_value(&self, context: &VariableContext) -> Result<String, AuthError> {
        match self {
            AuthConfig::Basic { username, password } => {
                let username = resolve_field("username", username, context)?;
                let password = resolve_field("password", password, context)?;
                if username.is_empty() {
                    return Err(AuthError::MissingCredentials(
                        "basic auth requires a username".to_string(),
                    ));
                }
                Ok(basic::basic_auth(&username, &password))
            }
            AuthConfig::Bearer { token } => {
                let token = resolve_field("token", token, context)?;
                if token.trim().is_empty() {
                    return Err(AuthError::MissingCredentials(
                        "bearer auth requires a token".to_string(),
                    ));
                }
                Ok(bearer_token(token.trim()))
            }
            AuthConfig::OAuth2ClientCredentials { .. } => {
                Err(AuthError::UnsupportedScheme(self.scheme().to_string()))
            }
        }
    }
}

impl fmt::Display for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::Basic { username, .. } => write!(f, "basic ({})", username),
            AuthConfig::Bearer { .. } => write!(f, "bearer"),
            AuthConfig::OAuth2ClientCredentials {
                token_url,
                client_id,
                ..
            } => write!(f, "oauth2-client-credentials ({} @ {})", client_id, token_url),
        }
    }
}

fn resolve_field(
    field: &'static str,
    value: &str,
    context: &VariableContext,
) -> Result<String, AuthError> {
    substitute_variables(value, context).map_err(|source| AuthError::Unresolved { field, source })
}

/// Formats a token into a Bearer authentication header value.
pub fn bearer_token(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Applies a template's authentication to a resolved request.
///
/// Any `Authorization` header already on the request is replaced, matching
/// its name case-insensitively. With no auth configured the request is left
/// untouched.
pub fn apply_authentication(
    request: &mut HttpRequest,
    auth: Option<&AuthConfig>,
    context: &VariableContext,
) -> Result<(), AuthError> {
    let Some(auth) = auth else {
        return Ok(());
    };

    let value = auth.header_value(context)?;
    request.set_header("Authorization", value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableStore;

    fn store() -> VariableStore {
        let mut store = VariableStore::new();
        store.set("user", "alice");
        store.set("pass", "s3cret");
        store.set("token", "tok-42");
        store
    }

    #[test]
    fn test_basic_header_with_variables() {
        let store = store();
        let auth = AuthConfig::Basic {
            username: "${USER}".to_string(),
            password: "${PASS}".to_string(),
        };

        let header = auth.header_value(&VariableContext::new(&store)).unwrap();
        assert_eq!(header, basic::basic_auth("alice", "s3cret"));
    }

    #[test]
    fn test_bearer_header() {
        let store = store();
        let auth = AuthConfig::Bearer {
            token: "${token}".to_string(),
        };
        assert_eq!(
            auth.header_value(&VariableContext::new(&store)).unwrap(),
            "Bearer tok-42"
        );
    }

    #[test]
    fn test_unresolved_field_names_field() {
        let store = VariableStore::new();
        let auth = AuthConfig::Bearer {
            token: "${MISSING}".to_string(),
        };

        let err = auth.header_value(&VariableContext::new(&store)).unwrap_err();
        assert_eq!(
            err,
            AuthError::Unresolved {
                field: "token",
                source: VarError::UndefinedVariable("MISSING".to_string()),
            }
        );
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let store = VariableStore::new();
        let context = VariableContext::new(&store);

        let basic = AuthConfig::Basic {
            username: String::new(),
            password: "x".to_string(),
        };
        assert!(matches!(
            basic.header_value(&context),
            Err(AuthError::MissingCredentials(_))
        ));

        let bearer = AuthConfig::Bearer {
            token: "  ".to_string(),
        };
        assert!(matches!(
            bearer.header_value(&context),
            Err(AuthError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_oauth2_is_unsupported() {
        let store = VariableStore::new();
        let auth = AuthConfig::OAuth2ClientCredentials {
            token_url: "https://auth.example.com/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            scope: None,
        };

        assert_eq!(
            auth.header_value(&VariableContext::new(&store)),
            Err(AuthError::UnsupportedScheme(
                "oauth2-client-credentials".to_string()
            ))
        );
    }

    #[test]
    fn test_apply_replaces_existing_header() {
        let store = store();
        let mut request = HttpRequest::new("GET", "https://api.example.com");
        request.add_header("authorization", "Basic old");

        let auth = AuthConfig::Bearer {
            token: "${TOKEN}".to_string(),
        };
        apply_authentication(&mut request, Some(&auth), &VariableContext::new(&store)).unwrap();

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("Authorization"), Some("Bearer tok-42"));
    }

    #[test]
    fn test_apply_without_auth_is_noop() {
        let store = VariableStore::new();
        let mut request = HttpRequest::new("GET", "https://api.example.com");
        request.add_header("Authorization", "Bearer manual");

        apply_authentication(&mut request, None, &VariableContext::new(&store)).unwrap();
        assert_eq!(request.header("authorization"), Some("Bearer manual"));
    }

    #[test]
    fn test_serde_tagging() {
        let auth = AuthConfig::Basic {
            username: "u".to_string(),
            password: "p".to_string(),
        };
        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["type"], "basic");

        let oauth: AuthConfig = serde_json::from_str(
            r#"{"type": "oauth2-client-credentials", "token_url": "t", "client_id": "c", "client_secret": "s"}"#,
        )
        .unwrap();
        assert_eq!(oauth.scheme(), "oauth2-client-credentials");
    }
}
