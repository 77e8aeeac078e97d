//! Project settings and their attribute table.
//!
//! Settings are addressed from the command line by kebab-case keys such as
//! `var-prefix` or `cookie-lifetime`. Each key maps to one [`SettingEntry`]
//! holding its description, a getter and a validating setter.

pub mod schema;

pub use schema::{CapturePolicy, Settings};

use std::fmt;
use std::str::FromStr;

/// Errors raised while reading or updating a setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No setting has this key
    UnknownKey(String),
    /// The value does not parse or fails validation
    InvalidValue { key: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownKey(key) => write!(f, "Unknown setting: {}", key),
            ConfigError::InvalidValue { key, reason } => {
                write!(f, "Invalid value for {}: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings addressable by key. Variant order matches the rows of the
/// attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    HistoryFile,
    SessionFile,
    CookieLifetime,
    RecordHistory,
    RecordCookies,
    VarPrefix,
    Timeout,
    CapturePolicy,
    HistoryLimit,
}

/// One row of the attribute table.
pub struct SettingEntry {
    pub key: SettingKey,
    pub name: &'static str,
    pub description: &'static str,
    pub get: fn(&Settings) -> String,
    pub set: fn(&mut Settings, &str) -> Result<(), String>,
}

impl fmt::Debug for SettingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingEntry")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish()
    }
}

static SETTINGS: [SettingEntry; 9] = [
    SettingEntry {
        key: SettingKey::HistoryFile,
        name: "history-file",
        description: "History log path, relative to the project directory",
        get: get_history_file,
        set: set_history_file,
    },
    SettingEntry {
        key: SettingKey::SessionFile,
        name: "session-file",
        description: "Cookie session path, relative to the project directory",
        get: get_session_file,
        set: set_session_file,
    },
    SettingEntry {
        key: SettingKey::CookieLifetime,
        name: "cookie-lifetime",
        description: "Seconds a recorded cookie is kept",
        get: get_cookie_lifetime,
        set: set_cookie_lifetime,
    },
    SettingEntry {
        key: SettingKey::RecordHistory,
        name: "record-history",
        description: "Append every send to the history log (true/false)",
        get: get_record_history,
        set: set_record_history,
    },
    SettingEntry {
        key: SettingKey::RecordCookies,
        name: "record-cookies",
        description: "Record and replay cookies between invocations (true/false)",
        get: get_record_cookies,
        set: set_record_cookies,
    },
    SettingEntry {
        key: SettingKey::VarPrefix,
        name: "var-prefix",
        description: "Placeholder prefix symbol",
        get: get_var_prefix,
        set: set_var_prefix,
    },
    SettingEntry {
        key: SettingKey::Timeout,
        name: "timeout",
        description: "Request timeout in seconds",
        get: get_timeout,
        set: set_timeout,
    },
    SettingEntry {
        key: SettingKey::CapturePolicy,
        name: "capture-policy",
        description: "What a failed capture does: warn or abort",
        get: get_capture_policy,
        set: set_capture_policy,
    },
    SettingEntry {
        key: SettingKey::HistoryLimit,
        name: "history-limit",
        description: "Maximum number of history entries kept",
        get: get_history_limit,
        set: set_history_limit,
    },
];

/// All settings in display order.
pub fn setting_entries() -> &'static [SettingEntry] {
    &SETTINGS
}

impl SettingKey {
    /// Table row for this key.
    pub fn entry(self) -> &'static SettingEntry {
        &SETTINGS[self as usize]
    }

    /// Kebab-case name used on the command line.
    pub fn name(self) -> &'static str {
        self.entry().name
    }
}

impl FromStr for SettingKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-").to_ascii_lowercase();
        SETTINGS
            .iter()
            .find(|entry| entry.name == wanted)
            .map(|entry| entry.key)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reads a setting by key.
pub fn get_setting(settings: &Settings, key: &str) -> Result<String, ConfigError> {
    let key: SettingKey = key.parse()?;
    Ok((key.entry().get)(settings))
}

/// Updates a setting by key.
///
/// The change is applied to a copy and validated as a whole before it is
/// written back, so a rejected value leaves `settings` untouched.
pub fn set_setting(settings: &mut Settings, key: &str, value: &str) -> Result<(), ConfigError> {
    let key: SettingKey = key.parse()?;
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: key.name().to_string(),
        reason,
    };

    let mut updated = settings.clone();
    (key.entry().set)(&mut updated, value).map_err(invalid)?;
    updated.validate().map_err(invalid)?;

    log::debug!("Setting {} = {}", key, value);
    *settings = updated;
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(format!("expected true or false, got '{}'", other)),
    }
}

fn parse_number<T: FromStr>(value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("expected a non-negative integer, got '{}'", value.trim()))
}

fn get_history_file(s: &Settings) -> String {
    s.history_file.clone()
}

fn set_history_file(s: &mut Settings, value: &str) -> Result<(), String> {
    s.history_file = value.trim().to_string();
    Ok(())
}

fn get_session_file(s: &Settings) -> String {
    s.session_file.clone()
}

fn set_session_file(s: &mut Settings, value: &str) -> Result<(), String> {
    s.session_file = value.trim().to_string();
    Ok(())
}

fn get_cookie_lifetime(s: &Settings) -> String {
    s.cookie_lifetime_secs.to_string()
}

fn set_cookie_lifetime(s: &mut Settings, value: &str) -> Result<(), String> {
    s.cookie_lifetime_secs = parse_number(value)?;
    Ok(())
}

fn get_record_history(s: &Settings) -> String {
    s.record_history.to_string()
}

fn set_record_history(s: &mut Settings, value: &str) -> Result<(), String> {
    s.record_history = parse_bool(value)?;
    Ok(())
}

fn get_record_cookies(s: &Settings) -> String {
    s.record_cookies.to_string()
}

fn set_record_cookies(s: &mut Settings, value: &str) -> Result<(), String> {
    s.record_cookies = parse_bool(value)?;
    Ok(())
}

fn get_var_prefix(s: &Settings) -> String {
    s.var_prefix.clone()
}

fn set_var_prefix(s: &mut Settings, value: &str) -> Result<(), String> {
    s.var_prefix = value.to_string();
    Ok(())
}

fn get_timeout(s: &Settings) -> String {
    s.timeout_secs.to_string()
}

fn set_timeout(s: &mut Settings, value: &str) -> Result<(), String> {
    s.timeout_secs = parse_number(value)?;
    Ok(())
}

fn get_capture_policy(s: &Settings) -> String {
    s.capture_policy.to_string()
}

fn set_capture_policy(s: &mut Settings, value: &str) -> Result<(), String> {
    s.capture_policy = value.parse()?;
    Ok(())
}

fn get_history_limit(s: &Settings) -> String {
    s.history_limit.to_string()
}

fn set_history_limit(s: &mut Settings, value: &str) -> Result<(), String> {
    s.history_limit = parse_number(value)?;
    Ok(())
}
