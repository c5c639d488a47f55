//! Header values, header scopes, and the three-scope merge.
//!
//! # Design
//! Headers are configured at three scopes: process-wide (`Context`),
//! per-client, and per-request. Each scope is an insertion-ordered
//! `HeaderSet`. Names are matched exactly, so `Accept` and `accept` are two
//! entries. Setting a value to `None` removes the entry, which lets an outer
//! scope's value show through again.
//!
//! Values are typed (`HeaderValue`) and rendered to their canonical string
//! form only when a call executes. Validation happens at the same point, so
//! a bad value surfaces as a `Configuration` error from `execute`.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};

/// A header value before rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Rendered as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    Date(DateTime<Utc>),
}

impl HeaderValue {
    /// Canonical string form, validated for use on the wire.
    pub fn render(&self) -> Result<String> {
        let text = match self {
            HeaderValue::Text(s) => s.clone(),
            HeaderValue::Int(i) => i.to_string(),
            HeaderValue::Float(f) if f.is_finite() => f.to_string(),
            HeaderValue::Float(f) => {
                return Err(Error::configuration(format!(
                    "non-finite number {f} is not a valid header value"
                )))
            }
            HeaderValue::Bool(b) => b.to_string(),
            HeaderValue::Date(d) => http_date(d),
        };
        if let Some(c) = text.chars().find(|c| c.is_control() && *c != '\t') {
            return Err(Error::configuration(format!(
                "header value contains control character {c:?}"
            )));
        }
        Ok(text)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Text(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Text(v)
    }
}

impl From<&String> for HeaderValue {
    fn from(v: &String) -> Self {
        HeaderValue::Text(v.clone())
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<DateTime<Utc>> for HeaderValue {
    fn from(v: DateTime<Utc>) -> Self {
        HeaderValue::Date(v)
    }
}

macro_rules! int_header_value {
    ($($t:ty),*) => {
        $(impl From<$t> for HeaderValue {
            fn from(v: $t) -> Self {
                HeaderValue::Int(i64::from(v))
            }
        })*
    };
}

int_header_value!(i8, i16, i32, i64, u8, u16, u32);

impl TryFrom<Value> for HeaderValue {
    type Error = Error;

    /// Accepts strings, numbers, and booleans. Null, arrays, and objects
    /// have no header representation.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(HeaderValue::Text(s)),
            Value::Bool(b) => Ok(HeaderValue::Bool(b)),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(HeaderValue::Int(i)),
                (None, Some(f)) => Ok(HeaderValue::Float(f)),
                (None, None) => Err(Error::configuration(format!(
                    "number {n} is not a valid header value"
                ))),
            },
            other => Err(Error::configuration(format!(
                "unsupported header value type: {other}"
            ))),
        }
    }
}

/// Format a timestamp as an RFC 7231 IMF-fixdate.
pub fn http_date(at: &DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// One scope of headers, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSet {
    entries: Vec<(String, HeaderValue)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear `name`. A `None` value removes the entry; a repeated name
    /// replaces the previous value in place.
    pub fn set(&mut self, name: impl Into<String>, value: Option<HeaderValue>) {
        let name = name.into();
        let existing = self.entries.iter().position(|(n, _)| *n == name);
        match (existing, value) {
            (Some(i), Some(v)) => self.entries[i].1 = v,
            (None, Some(v)) => self.entries.push((name, v)),
            (Some(i), None) => {
                self.entries.remove(i);
            }
            (None, None) => {}
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        self.set(name, Some(value.into()));
    }

    pub fn remove(&mut self, name: &str) {
        self.set(name, None);
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` onto `self`, key for key.
    fn overlay(&mut self, other: &HeaderSet) {
        for (name, value) in &other.entries {
            self.set(name.clone(), Some(value.clone()));
        }
    }
}

/// Merge scopes from lowest to highest precedence. Later scopes win key for
/// key; a missing scope contributes nothing.
pub fn merge(
    process: Option<&HeaderSet>,
    instance: Option<&HeaderSet>,
    request: Option<&HeaderSet>,
) -> HeaderSet {
    let mut merged = HeaderSet::new();
    for scope in [process, instance, request].into_iter().flatten() {
        merged.overlay(scope);
    }
    merged
}

/// Render and validate every entry for the wire.
pub(crate) fn render(headers: &HeaderSet) -> Result<Vec<(String, String)>> {
    headers
        .iter()
        .map(|(name, value)| {
            if !is_token(name) {
                return Err(Error::configuration(format!(
                    "invalid header name {name:?}"
                )));
            }
            let rendered = value
                .render()
                .map_err(|e| Error::configuration(format!("header '{name}': {}", e.message())))?;
            Ok((name.to_string(), rendered))
        })
        .collect()
}

/// Add `name: value` unless a header with that name (any case) is present.
pub(crate) fn ensure(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if !headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
        headers.push((name.to_string(), value.to_string()));
    }
}

// RFC 7230 token characters.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
