//! Variable extraction from HTTP response bodies.
//!
//! Scrapers built by [`parse_capture_spec`](super::parse_capture_spec) run
//! against the raw response bytes. Byte-offset scrapers return the selected
//! bytes as text; JSON-path scrapers decode the body and walk it step by step.
//!
//! # Examples
//!
//! ```
//! use rest_flow::variables::parse_capture_spec;
//!
//! let scraper = parse_capture_spec("token", ".a.b").unwrap();
//! assert_eq!(scraper.scrape(br#"{"a": {"b": "x"}}"#).unwrap(), "x");
//! ```

use super::capture::{CaptureError, PathStep, ScrapeTarget, VarScraper};
use super::VariableStore;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

impl VarScraper {
    /// Extracts this scraper's value from a response body.
    pub fn scrape(&self, data: &[u8]) -> Result<String, CaptureError> {
        match &self.target {
            ScrapeTarget::Offset { start, end } => scrape_offset(data, *start, *end),
            ScrapeTarget::JsonPath(steps) => scrape_json(data, steps),
        }
    }
}

/// Returns the bytes in `[start, end)` as text.
fn scrape_offset(data: &[u8], start: usize, end: i64) -> Result<String, CaptureError> {
    let len = data.len();
    let out_of_range = || CaptureError::OffsetOutOfRange { start, end, len };

    let resolved_end = match end {
        0 => len,
        e if e < 0 => len
            .checked_sub(e.unsigned_abs() as usize)
            .ok_or_else(out_of_range)?,
        e => {
            let e = e as usize;
            if e > len {
                return Err(out_of_range());
            }
            e
        }
    };

    if start > resolved_end {
        return Err(out_of_range());
    }

    Ok(String::from_utf8_lossy(&data[start..resolved_end]).into_owned())
}

/// Decodes the body as a JSON object or array and walks the path.
fn scrape_json(data: &[u8], steps: &[PathStep]) -> Result<String, CaptureError> {
    let root = decode_json_container(data)?;

    let mut current = &root;
    for (i, step) in steps.iter().enumerate() {
        let broken = |reason: String| CaptureError::Traversal {
            step: i + 1,
            segment: step.to_string(),
            reason,
        };

        current = match (step, current) {
            (PathStep::Key(key), JsonValue::Object(map)) => map
                .get(key)
                .ok_or_else(|| broken("key not present".to_string()))?,
            (PathStep::Index(index), JsonValue::Array(items)) => {
                items.get(*index).ok_or_else(|| {
                    broken(format!("index out of range for array of length {}", items.len()))
                })?
            }
            (PathStep::Key(_), other) => {
                return Err(broken(format!("cannot look up a key in {}", json_kind(other))))
            }
            (PathStep::Index(_), other) => {
                return Err(broken(format!("cannot index into {}", json_kind(other))))
            }
        };
    }

    Ok(json_value_to_string(current))
}

/// Parses a body whose first non-whitespace byte opens an object or array.
fn decode_json_container(data: &[u8]) -> Result<JsonValue, CaptureError> {
    let first = data.iter().find(|b| !b.is_ascii_whitespace());

    match first {
        Some(b'{') => serde_json::from_slice::<Map<String, JsonValue>>(data)
            .map(JsonValue::Object)
            .map_err(|e| CaptureError::Decode(e.to_string())),
        Some(b'[') => serde_json::from_slice::<Vec<JsonValue>>(data)
            .map(JsonValue::Array)
            .map_err(|e| CaptureError::Decode(e.to_string())),
        Some(_) => Err(CaptureError::Decode(
            "response body is not a JSON object or array".to_string(),
        )),
        None => Err(CaptureError::Decode("response body is empty".to_string())),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Converts a JSON value to a string representation.
///
/// Strings are returned as-is (without quotes); everything else uses its
/// compact JSON text.
fn json_value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A capture that failed against an actual response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    /// Variable the capture would have written
    pub variable: String,

    /// Why the scrape failed
    pub error: CaptureError,
}

impl fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capture {}: {}", self.variable, self.error)
    }
}

/// Outcome of running a template's captures against one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// `(variable, value)` pairs written to the store
    pub captured: Vec<(String, String)>,

    /// Captures that failed; the store was left untouched for these
    pub failures: Vec<CaptureFailure>,
}

impl CaptureReport {
    /// Whether every capture succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs every scraper against the body and writes successful results into
/// the current environment of the store.
///
/// A failing scraper is recorded in the report and does not stop the others.
pub fn apply_captures<'a>(
    scrapers: impl IntoIterator<Item = &'a VarScraper>,
    body: &[u8],
    store: &mut VariableStore,
) -> CaptureReport {
    let mut report = CaptureReport::default();

    for scraper in scrapers {
        match scraper.scrape(body) {
            Ok(value) => {
                log::debug!("captured {} ({} bytes)", scraper.name, value.len());
                store.set(&scraper.name, value.clone());
                report.captured.push((scraper.name.clone(), value));
            }
            Err(error) => {
                log::warn!("capture {} failed: {}", scraper.name, error);
                report.failures.push(CaptureFailure {
                    variable: scraper.name.clone(),
                    error,
                });
            }
        }
    }

    report
}
