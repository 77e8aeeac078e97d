//! Capture spec parsing for extracting variables from HTTP responses.
//!
//! A capture pairs a variable name with a scraper that pulls a value out of a
//! response body after a template is sent.
//!
//! # Syntax
//!
//! ```text
//! raw                     whole body
//! :START,END              byte range [START, END)
//! .records[1].auth.token  JSON traversal
//! ```
//!
//! In the byte-offset form both sides are optional and default to 0. An END of
//! 0 means "to the end of the body" and a negative END counts back from the
//! end. A JSON path always starts with a dot; `.[0]` indexes a top-level array.

use super::{is_valid_var_name, normalize_name};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors produced while parsing capture specs or scraping responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The capture spec does not follow either grammar
    InvalidSpec { spec: String, reason: String },

    /// The capture's variable name is not a valid variable name
    InvalidName(String),

    /// A byte range does not fit the response body
    OffsetOutOfRange { start: usize, end: i64, len: usize },

    /// The response body could not be decoded as a JSON object or array
    Decode(String),

    /// JSON traversal broke at a specific (1-based) step
    Traversal {
        step: usize,
        segment: String,
        reason: String,
    },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::InvalidSpec { spec, reason } => {
                write!(f, "Invalid capture spec '{}': {}", spec, reason)
            }
            CaptureError::InvalidName(name) => write!(f, "Invalid capture variable '{}'", name),
            CaptureError::OffsetOutOfRange { start, end, len } => write!(
                f,
                "Offset range {},{} is out of bounds for a {}-byte body",
                start, end, len
            ),
            CaptureError::Decode(msg) => write!(f, "Failed to decode JSON response: {}", msg),
            CaptureError::Traversal {
                step,
                segment,
                reason,
            } => write!(f, "JSON path failed at step {} ({}): {}", step, segment, reason),
        }
    }
}

impl std::error::Error for CaptureError {}

/// A single JSON traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Object key access, e.g. `.token`
    Key(String),

    /// Array index access, e.g. `[1]`
    Index(usize),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => write!(f, ".{}", key),
            PathStep::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Where a scraper reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeTarget {
    /// Raw byte range of the body. `end` of 0 means end of body; negative
    /// values count back from the end.
    Offset { start: usize, end: i64 },

    /// Steps through a parsed JSON object or array.
    JsonPath(Vec<PathStep>),
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeTarget::Offset { start: 0, end: 0 } => write!(f, "raw"),
            ScrapeTarget::Offset { start, end } => write!(f, ":{},{}", start, end),
            ScrapeTarget::JsonPath(steps) => {
                // A path that starts with an index still needs its leading dot
                if let Some(PathStep::Index(_)) = steps.first() {
                    write!(f, ".")?;
                }
                for step in steps {
                    write!(f, "{}", step)?;
                }
                Ok(())
            }
        }
    }
}

/// A compiled capture: the variable it writes and where it reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CaptureRecord", into = "CaptureRecord")]
pub struct VarScraper {
    /// Canonical (upper case) variable name
    pub name: String,

    /// Addressing mode
    pub target: ScrapeTarget,
}

impl VarScraper {
    /// Canonical spec string, as accepted by [`parse_capture_spec`].
    pub fn spec(&self) -> String {
        self.target.to_string()
    }
}

impl fmt::Display for VarScraper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.target)
    }
}

/// Persisted form of a capture.
#[derive(Serialize, Deserialize)]
struct CaptureRecord {
    name: String,
    spec: String,
}

impl TryFrom<CaptureRecord> for VarScraper {
    type Error = CaptureError;

    fn try_from(record: CaptureRecord) -> Result<Self, Self::Error> {
        parse_capture_spec(&record.name, &record.spec)
    }
}

impl From<VarScraper> for CaptureRecord {
    fn from(scraper: VarScraper) -> Self {
        CaptureRecord {
            spec: scraper.spec(),
            name: scraper.name,
        }
    }
}

/// Parses a capture spec into a scraper for the named variable.
///
/// # Examples
///
/// ```
/// use rest_flow::variables::capture::{parse_capture_spec, PathStep, ScrapeTarget};
///
/// let scraper = parse_capture_spec("token", ".records[1].auth.token").unwrap();
/// assert_eq!(scraper.name, "TOKEN");
/// assert_eq!(
///     scraper.target,
///     ScrapeTarget::JsonPath(vec![
///         PathStep::Key("records".to_string()),
///         PathStep::Index(1),
///         PathStep::Key("auth".to_string()),
///         PathStep::Key("token".to_string()),
///     ])
/// );
///
/// let raw = parse_capture_spec("body", "raw").unwrap();
/// assert_eq!(raw.target, ScrapeTarget::Offset { start: 0, end: 0 });
/// ```
pub fn parse_capture_spec(var_name: &str, spec: &str) -> Result<VarScraper, CaptureError> {
    if !is_valid_var_name(var_name) {
        return Err(CaptureError::InvalidName(var_name.to_string()));
    }

    let spec = spec.trim();
    let invalid = |reason: &str| CaptureError::InvalidSpec {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let target = if spec.is_empty() {
        return Err(invalid("spec is empty"));
    } else if spec.eq_ignore_ascii_case("raw") {
        ScrapeTarget::Offset { start: 0, end: 0 }
    } else if let Some(offsets) = spec.strip_prefix(':') {
        parse_offsets(offsets).map_err(|reason| invalid(&reason))?
    } else if spec.starts_with('.') {
        ScrapeTarget::JsonPath(parse_json_path(spec).map_err(|reason| invalid(&reason))?)
    } else {
        return Err(invalid(
            "must be 'raw', a byte range starting with ':' or a JSON path starting with '.'",
        ));
    };

    Ok(VarScraper {
        name: normalize_name(var_name),
        target,
    })
}

/// Parses the `START,END` part of a byte-offset spec.
fn parse_offsets(offsets: &str) -> Result<ScrapeTarget, String> {
    let (start_str, end_str) = offsets.split_once(',').unwrap_or((offsets, ""));
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let start = if start_str.is_empty() {
        0
    } else {
        start_str
            .parse::<usize>()
            .map_err(|_| format!("start offset '{}' is not a non-negative integer", start_str))?
    };

    let end = if end_str.is_empty() {
        0
    } else {
        end_str
            .parse::<i64>()
            .map_err(|_| format!("end offset '{}' is not an integer", end_str))?
    };

    if end > 0 && start > end as usize {
        return Err(format!("start offset {} is after end offset {}", start, end));
    }

    Ok(ScrapeTarget::Offset { start, end })
}

/// Parses a dot-led JSON path into traversal steps.
fn parse_json_path(spec: &str) -> Result<Vec<PathStep>, String> {
    let chars: Vec<char> = spec.chars().collect();
    let mut steps = Vec::new();
    // Position 0 is the mandatory leading dot
    let mut i = 1;
    let mut after_dot = true;

    while i < chars.len() {
        match chars[i] {
            '[' => {
                if after_dot && !steps.is_empty() {
                    return Err("empty key before '['".to_string());
                }
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| "unterminated '['".to_string())?;
                let digits: String = chars[i + 1..i + 1 + close].iter().collect();
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(format!("array index '{}' is not a non-negative integer", digits));
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| format!("array index '{}' is too large", digits))?;
                steps.push(PathStep::Index(index));
                i += close + 2;
                after_dot = false;
            }
            '.' => {
                if after_dot {
                    return Err("empty key segment".to_string());
                }
                after_dot = true;
                i += 1;
            }
            ']' => return Err("unexpected ']'".to_string()),
            _ => {
                if !after_dot {
                    return Err(format!("expected '.' or '[' at position {}", i));
                }
                let start = i;
                while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
                    i += 1;
                }
                steps.push(PathStep::Key(chars[start..i].iter().collect()));
                after_dot = false;
            }
        }
    }

    if after_dot {
        return Err("path must not end with '.'".to_string());
    }

    Ok(steps)
}
