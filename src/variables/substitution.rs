//! Variable substitution engine for REST Flow
//!
//! This module replaces `${NAME}` placeholders in URLs, header values and
//! bodies with their resolved values. The prefix symbol is configurable per
//! project, names are case-insensitive, and a doubled prefix escapes a
//! placeholder.
//!
//! # Escape rule
//!
//! Text is scanned left to right. At each position the escape form
//! `PREFIX PREFIX {NAME}` is tried before the placeholder form `PREFIX {NAME}`.
//! An escape is emitted as `PREFIX{NAME}` (one prefix removed) and is not
//! substituted:
//!
//! | input       | output              |
//! |-------------|---------------------|
//! | `${X}`      | value of X          |
//! | `$${X}`     | `${X}`              |
//! | `$$${X}`    | `$${X}`             |
//! | `$${A}${B}` | `${A}` + value of B |

use super::{normalize_name, VariableStore};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// Default placeholder prefix.
pub const DEFAULT_PREFIX: &str = "$";

/// Cached pattern for the default `$` prefix.
static DEFAULT_PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    placeholder_regex(DEFAULT_PREFIX).expect("Failed to compile placeholder regex")
});

static VAR_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Failed to compile name regex"));

/// Errors that can occur during variable resolution
#[derive(Debug, Clone, PartialEq)]
pub enum VarError {
    /// Variable is not defined in any source
    UndefinedVariable(String),
    /// Variable name contains characters outside `[A-Za-z0-9_-]`
    InvalidName(String),
    /// Prefix symbol cannot be used to build a placeholder pattern
    InvalidPrefix(String),
    /// The default environment cannot be deleted
    ProtectedEnvironment,
}

impl fmt::Display for VarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarError::UndefinedVariable(name) => write!(f, "Undefined variable: {}", name),
            VarError::InvalidName(name) => write!(
                f,
                "Invalid variable name '{}': only letters, digits, '_' and '-' are allowed",
                name
            ),
            VarError::InvalidPrefix(prefix) => write!(f, "Invalid variable prefix: '{}'", prefix),
            VarError::ProtectedEnvironment => {
                write!(f, "The default environment cannot be deleted")
            }
        }
    }
}

impl std::error::Error for VarError {}

/// Checks that a variable name only uses letters, digits, `_` and `-`.
pub fn is_valid_var_name(name: &str) -> bool {
    VAR_NAME_REGEX.is_match(name)
}

/// Builds the placeholder pattern for a prefix.
///
/// The optional `escape` group holds the extra prefix copy of an escaped
/// placeholder.
fn placeholder_regex(prefix: &str) -> Result<Regex, VarError> {
    if prefix.is_empty() || prefix.contains('{') || prefix.contains('}') {
        return Err(VarError::InvalidPrefix(prefix.to_string()));
    }

    let p = regex::escape(prefix);
    Regex::new(&format!(r"(?P<escape>{p})?{p}\{{(?P<name>[A-Za-z0-9_-]+)\}}"))
        .map_err(|_| VarError::InvalidPrefix(prefix.to_string()))
}

/// Context for variable resolution containing all available variable sources
#[derive(Debug, Clone)]
pub struct VariableContext<'a> {
    /// Variable store consulted after the overrides
    pub store: &'a VariableStore,

    /// One-time overrides keyed by canonical name; highest priority
    overrides: HashMap<String, String>,

    /// Placeholder prefix symbol
    pub prefix: String,
}

impl<'a> VariableContext<'a> {
    /// Creates a context over a store with no overrides and the `$` prefix.
    pub fn new(store: &'a VariableStore) -> Self {
        Self {
            store,
            overrides: HashMap::new(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Adds one-time overrides. Keys are matched case-insensitively.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        self.overrides.extend(
            overrides
                .iter()
                .map(|(name, value)| (normalize_name(name), value.clone())),
        );
        self
    }

    /// Uses a different placeholder prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Resolves a variable by name, checking all available sources in priority order
    ///
    /// Priority order:
    /// 1. Overrides
    /// 2. Current environment
    /// 3. Default environment (only when the current one is not the default)
    pub fn resolve_variable(&self, name: &str) -> Result<String, VarError> {
        let key = normalize_name(name);

        if let Some(value) = self.overrides.get(&key) {
            return Ok(value.clone());
        }

        self.store
            .lookup(&key)
            .map(str::to_string)
            .ok_or(VarError::UndefinedVariable(key))
    }
}

/// Substitutes all `${NAME}` placeholders in the input text
///
/// Either every placeholder resolves and the fully substituted text is
/// returned, or the first unresolved name is reported and nothing is
/// returned.
///
/// # Examples
///
/// ```
/// use rest_flow::variables::{substitute_variables, VariableContext, VariableStore};
///
/// let mut store = VariableStore::new();
/// store.set("user_id", "42");
///
/// let context = VariableContext::new(&store);
/// let text = substitute_variables("/users/${USER_ID}?raw=$${USER_ID}", &context).unwrap();
/// assert_eq!(text, "/users/42?raw=${USER_ID}");
/// ```
pub fn substitute_variables(text: &str, context: &VariableContext) -> Result<String, VarError> {
    // Fast path: no prefix means nothing to substitute
    if !text.contains(context.prefix.as_str()) {
        return Ok(text.to_string());
    }

    let compiled;
    let re = if context.prefix == DEFAULT_PREFIX {
        &*DEFAULT_PLACEHOLDER_REGEX
    } else {
        compiled = placeholder_regex(&context.prefix)?;
        &compiled
    };

    let mut result = String::with_capacity(text.len() + (text.len() / 4));
    let mut last_match_end = 0;

    for cap in re.captures_iter(text) {
        let (Some(full_match), Some(name)) = (cap.get(0), cap.name("name")) else {
            continue;
        };

        result.push_str(&text[last_match_end..full_match.start()]);

        if cap.name("escape").is_some() {
            result.push_str(&full_match.as_str()[context.prefix.len()..]);
        } else {
            let value = context.resolve_variable(name.as_str())?;
            log::debug!("substituted {} ({} bytes)", normalize_name(name.as_str()), value.len());
            result.push_str(&value);
        }

        last_match_end = full_match.end();
    }

    result.push_str(&text[last_match_end..]);
    Ok(result)
}
