//! Request execution configuration.

use crate::config::{CapturePolicy, Settings};
use crate::variables::DEFAULT_PREFIX;
use std::time::Duration;

/// Parameters that control how a template is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Placeholder prefix used when resolving the template.
    pub var_prefix: String,

    /// What happens when a capture fails.
    pub capture_policy: CapturePolicy,
}

impl ExecutionConfig {
    /// Creates a config with the given timeout and default prefix and policy.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            var_prefix: DEFAULT_PREFIX.to_string(),
            capture_policy: CapturePolicy::default(),
        }
    }

    /// Builds the config from project settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            timeout_secs: settings.timeout_secs,
            var_prefix: settings.var_prefix.clone(),
            capture_policy: settings.capture_policy,
        }
    }

    /// Returns the timeout as a `std::time::Duration`.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
