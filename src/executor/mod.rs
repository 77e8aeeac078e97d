//! Single-template send path.
//!
//! Sending a template runs in three phases:
//!
//! 1. **Resolve**: placeholders in the method, URL, every header value, the
//!    body (when it is UTF-8) and the auth fields are substituted. Any
//!    unresolved variable aborts here, before network I/O.
//! 2. **Send**: the resolved [`HttpRequest`] goes to a [`Transport`].
//! 3. **Capture**: the template's captures run against the raw response body
//!    and successful values are written to the current environment.

pub mod config;
pub mod error;
pub mod native;

pub use config::ExecutionConfig;
pub use error::{RequestError, SendError};
pub use native::{ReqwestTransport, Transport};

use crate::auth::apply_authentication;
use crate::config::CapturePolicy;
use crate::models::{HttpRequest, HttpResponse, RequestTemplate};
use crate::variables::{
    apply_captures, substitute_variables, CaptureReport, VariableContext, VariableStore,
};
use std::collections::HashMap;

/// Everything produced by one send.
#[derive(Debug, Clone)]
pub struct SendResult {
    /// The request as it went on the wire
    pub request: HttpRequest,
    /// The response received
    pub response: HttpResponse,
    /// Outcome of the template's captures
    pub captures: CaptureReport,
}

impl SendResult {
    /// Applies the capture policy: under [`CapturePolicy::Abort`] any capture
    /// failure becomes an error. Successful captures have already been stored
    /// either way.
    pub fn enforce(&self, policy: CapturePolicy) -> Result<(), SendError> {
        match policy {
            CapturePolicy::Abort if !self.captures.is_clean() => {
                Err(SendError::CaptureFailed(self.captures.failures.clone()))
            }
            _ => Ok(()),
        }
    }
}

fn resolve(field: &str, text: &str, context: &VariableContext) -> Result<String, SendError> {
    substitute_variables(text, context).map_err(|source| SendError::Substitution {
        field: field.to_string(),
        source,
    })
}

/// Resolves a template into a request ready to send.
///
/// Either every placeholder resolves or an error names the field and the
/// first unresolved variable; a partially substituted request is never
/// returned.
pub fn prepare_request(
    template: &RequestTemplate,
    context: &VariableContext,
) -> Result<HttpRequest, SendError> {
    if !template.is_sendable() {
        return Err(SendError::IncompleteTemplate(template.name.clone()));
    }

    let method = resolve("method", &template.method, context)?;
    let url = resolve("url", &template.url, context)?;
    let mut request = HttpRequest::new(method.trim().to_uppercase(), url.trim());

    for (name, values) in &template.headers {
        let field = format!("header {}", name);
        for value in values {
            let value = resolve(&field, value, context)?;
            request.add_header(name.clone(), value);
        }
    }

    request.body = match &template.body {
        Some(body) => match std::str::from_utf8(body) {
            Ok(text) => Some(resolve("body", text, context)?.into_bytes()),
            // Binary bodies are sent untouched.
            Err(_) => Some(body.clone()),
        },
        None => None,
    };

    apply_authentication(&mut request, template.auth.as_ref(), context)?;

    Ok(request)
}

/// Runs a template's captures against a response, in variable-name order.
pub fn capture_response(
    template: &RequestTemplate,
    response: &HttpResponse,
    store: &mut VariableStore,
) -> CaptureReport {
    let mut scrapers: Vec<_> = template.captures.iter().collect();
    scrapers.sort_by(|a, b| a.name.cmp(&b.name));
    apply_captures(scrapers, &response.body, store)
}

/// Sends one template: resolve, send, capture.
///
/// Overrides take priority over the store for this send only. Captured
/// values are written to the store's current environment. The capture policy
/// is not applied here; see [`SendResult::enforce`].
///
/// # Examples
///
/// ```
/// use rest_flow::executor::{send_template, ExecutionConfig, RequestError, Transport};
/// use rest_flow::models::{HttpRequest, HttpResponse, RequestTemplate};
/// use rest_flow::variables::{parse_capture_spec, VariableStore};
/// use std::collections::HashMap;
///
/// struct Echo;
///
/// impl Transport for Echo {
///     fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
///         let mut response = HttpResponse::new(200, "OK");
///         response.set_body(format!(r#"{{"url": "{}"}}"#, request.url));
///         Ok(response)
///     }
/// }
///
/// let mut template = RequestTemplate::with_target("ping", "GET", "http://${HOST}/ping");
/// template.set_capture(parse_capture_spec("seen", ".url").unwrap());
///
/// let mut store = VariableStore::new();
/// store.set("host", "localhost");
///
/// let result = send_template(
///     &template,
///     &mut store,
///     &HashMap::new(),
///     &ExecutionConfig::default(),
///     &Echo,
/// )
/// .unwrap();
///
/// assert_eq!(result.request.url, "http://localhost/ping");
/// assert_eq!(store.get("seen"), "http://localhost/ping");
/// ```
pub fn send_template(
    template: &RequestTemplate,
    store: &mut VariableStore,
    overrides: &HashMap<String, String>,
    config: &ExecutionConfig,
    transport: &dyn Transport,
) -> Result<SendResult, SendError> {
    let request = {
        let context = VariableContext::new(store)
            .with_overrides(overrides)
            .with_prefix(config.var_prefix.as_str());
        prepare_request(template, &context)?
    };

    log::info!("Sending {} {} ({})", request.method, request.url, template.name);
    let response = transport.send(&request)?;
    log::info!(
        "{} {} {}",
        template.name,
        response.status_code,
        response.status_text
    );

    let captures = capture_response(template, &response, store);

    Ok(SendResult {
        request,
        response,
        captures,
    })
}
