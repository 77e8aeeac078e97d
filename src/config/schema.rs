//! Project settings schema.
//!
//! Settings live inside the project file. Missing fields fall back to the
//! defaults below, so older project files keep loading as settings are added.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What a send does when one of its captures fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePolicy {
    /// Log the failure and carry on; the send still succeeds.
    #[default]
    Warn,
    /// Report an error after storing the captures that did succeed.
    Abort,
}

impl fmt::Display for CapturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePolicy::Warn => write!(f, "warn"),
            CapturePolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for CapturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(CapturePolicy::Warn),
            "abort" => Ok(CapturePolicy::Abort),
            other => Err(format!("expected 'warn' or 'abort', got '{}'", other)),
        }
    }
}

/// Per-project settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// History log path, relative to the project file's directory.
    #[serde(default = "default_history_file")]
    pub history_file: String,

    /// Cookie session path, relative to the project file's directory.
    #[serde(default = "default_session_file")]
    pub session_file: String,

    /// Seconds a recorded cookie stays in the session. Must be > 0.
    #[serde(default = "default_cookie_lifetime_secs")]
    pub cookie_lifetime_secs: u64,

    /// Whether sends are appended to the history log.
    #[serde(default = "default_true")]
    pub record_history: bool,

    /// Whether `Set-Cookie` responses are recorded and replayed.
    #[serde(default = "default_true")]
    pub record_cookies: bool,

    /// Placeholder prefix symbol; `$` gives `${NAME}`.
    #[serde(default = "default_var_prefix")]
    pub var_prefix: String,

    /// Request timeout in seconds. Must be > 0.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Behaviour on capture failure.
    #[serde(default)]
    pub capture_policy: CapturePolicy,

    /// Maximum number of history entries kept. Must be > 0.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_file: default_history_file(),
            session_file: default_session_file(),
            cookie_lifetime_secs: default_cookie_lifetime_secs(),
            record_history: default_true(),
            record_cookies: default_true(),
            var_prefix: default_var_prefix(),
            timeout_secs: default_timeout_secs(),
            capture_policy: CapturePolicy::default(),
            history_limit: default_history_limit(),
        }
    }
}

impl Settings {
    /// Validates the settings and returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.history_limit == 0 {
            return Err("history-limit must be greater than 0".to_string());
        }

        if self.cookie_lifetime_secs == 0 {
            return Err("cookie-lifetime must be greater than 0".to_string());
        }

        if self.var_prefix.is_empty() || self.var_prefix.contains(['{', '}']) {
            return Err(format!(
                "var-prefix '{}' must be non-empty and must not contain braces",
                self.var_prefix
            ));
        }

        if self.history_file.trim().is_empty() || self.session_file.trim().is_empty() {
            return Err("history-file and session-file must not be empty".to_string());
        }

        Ok(())
    }

    /// Returns the timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the cookie lifetime as a `Duration`.
    pub fn cookie_lifetime(&self) -> Duration {
        Duration::from_secs(self.cookie_lifetime_secs)
    }
}

// Default value functions for serde

fn default_history_file() -> String {
    "history.json".to_string()
}

fn default_session_file() -> String {
    "session.json".to_string()
}

fn default_cookie_lifetime_secs() -> u64 {
    86_400 // one day
}

fn default_true() -> bool {
    true
}

fn default_var_prefix() -> String {
    "$".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    1000
}
