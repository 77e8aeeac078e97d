//! Cookie session shared between invocations.
//!
//! Every `Set-Cookie` header received is appended to a timestamped log.
//! The log is what gets persisted; the live cookie set is rebuilt from it
//! whenever a request needs a `Cookie` header. Records older than the
//! configured lifetime are evicted on load and on every new response.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// One recorded `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    /// When the header was received
    pub time: DateTime<Utc>,
    /// URL of the response that carried it
    pub url: String,
    /// Raw header value
    pub set_cookie: String,
}

/// Persisted cookie log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub cookies: Vec<CookieRecord>,
}

/// A cookie reconstructed from a record.
#[derive(Debug, Clone, PartialEq)]
struct ParsedCookie {
    name: String,
    value: String,
    domain: String,
    host_only: bool,
    path: String,
    secure: bool,
    expires: Option<DateTime<Utc>>,
}

impl ParsedCookie {
    fn parse(record: &CookieRecord) -> Option<Self> {
        let url = Url::parse(&record.url).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();

        let mut parts = record.set_cookie.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = ParsedCookie {
            name: name.to_string(),
            value: value.trim().to_string(),
            domain: host.clone(),
            host_only: true,
            path: default_path(url.path()),
            secure: false,
            expires: None,
        };
        let mut max_age: Option<i64> = None;

        for attr in parts {
            let (key, val) = match attr.split_once('=') {
                Some((k, v)) => (k.trim().to_ascii_lowercase(), v.trim()),
                None => (attr.trim().to_ascii_lowercase(), ""),
            };
            match key.as_str() {
                "domain" if !val.is_empty() => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    // A server may only set cookies for its own domain.
                    if !domain_matches(&domain, &host) {
                        return None;
                    }
                    cookie.domain = domain;
                    cookie.host_only = false;
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "secure" => cookie.secure = true,
                "max-age" => max_age = val.parse().ok(),
                "expires" => {
                    if let Ok(exp) = DateTime::parse_from_rfc2822(val) {
                        cookie.expires = Some(exp.with_timezone(&Utc));
                    }
                }
                _ => {}
            }
        }

        // Max-Age wins over Expires.
        if let Some(secs) = max_age {
            cookie.expires = Some(if secs <= 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                ChronoDuration::try_seconds(secs)
                    .and_then(|delta| record.time.checked_add_signed(delta))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            });
        }

        Some(cookie)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|exp| exp <= now)
    }

    fn same_slot(&self, other: &ParsedCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    fn applies_to(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        if self.secure && url.scheme() != "https" {
            return false;
        }

        let host_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&self.domain, &host)
        };

        host_ok && path_matches(&self.path, url.path())
    }
}

fn domain_matches(domain: &str, host: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    request_path == cookie_path
        || (request_path.starts_with(cookie_path)
            && (cookie_path.ends_with('/')
                || request_path[cookie_path.len()..].starts_with('/')))
}

/// RFC 6265 default path: the request path up to its last `/`.
fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

/// Cookie store that records every `Set-Cookie` header it sees.
#[derive(Debug)]
pub struct RecordingJar {
    log: Mutex<Vec<CookieRecord>>,
    lifetime: ChronoDuration,
}

impl RecordingJar {
    /// Creates a jar seeded from a persisted session, dropping stale records.
    pub fn new(session: &Session, lifetime: Duration) -> Self {
        let lifetime = ChronoDuration::from_std(lifetime).unwrap_or(ChronoDuration::MAX);
        let jar = Self {
            log: Mutex::new(session.cookies.clone()),
            lifetime,
        };
        jar.evict(Utc::now());
        jar
    }

    fn entries(&self) -> MutexGuard<'_, Vec<CookieRecord>> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict(&self, now: DateTime<Utc>) {
        let lifetime = self.lifetime;
        let mut log = self.entries();
        let before = log.len();
        log.retain(|record| now.signed_duration_since(record.time) < lifetime);
        let evicted = before - log.len();
        if evicted > 0 {
            log::warn!("Evicted {} expired cookie record(s)", evicted);
        }
    }

    /// Records one `Set-Cookie` header received from `url`.
    pub fn record(&self, url: &Url, set_cookie: &str) {
        self.record_at(url, set_cookie, Utc::now());
    }

    fn record_at(&self, url: &Url, set_cookie: &str, time: DateTime<Utc>) {
        log::debug!("Recording cookie from {}", url);
        self.entries().push(CookieRecord {
            time,
            url: url.to_string(),
            set_cookie: set_cookie.to_string(),
        });
    }

    /// The live cookie set: records replayed oldest first, later ones
    /// replacing earlier cookies with the same name, domain and path.
    fn live_cookies(&self, now: DateTime<Utc>) -> Vec<ParsedCookie> {
        let mut live: Vec<ParsedCookie> = Vec::new();
        for cookie in self.entries().iter().filter_map(ParsedCookie::parse) {
            live.retain(|existing| !existing.same_slot(&cookie));
            if !cookie.is_expired(now) {
                live.push(cookie);
            }
        }
        live
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let pairs: Vec<String> = self
            .live_cookies(Utc::now())
            .into_iter()
            .filter(|cookie| cookie.applies_to(url))
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Number of live cookies.
    pub fn live_count(&self) -> usize {
        self.live_cookies(Utc::now()).len()
    }

    /// Snapshot of the log for persisting.
    pub fn session(&self) -> Session {
        Session {
            cookies: self.entries().clone(),
        }
    }
}

impl CookieStore for RecordingJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let now = Utc::now();
        for header in cookie_headers {
            match header.to_str() {
                Ok(value) => self.record_at(url, value, now),
                Err(_) => log::warn!("Ignoring non-ASCII Set-Cookie header from {}", url),
            }
        }
        self.evict(now);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.cookie_header(url)
            .and_then(|value| HeaderValue::from_str(&value).ok())
    }
}
