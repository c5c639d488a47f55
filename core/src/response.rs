//! Response descriptor and body parsing.
//!
//! # Design
//! A `Response<T>` is created empty when a call starts and filled in as the
//! exchange progresses. Status and headers arrive first as a raw response
//! (`Response<Vec<u8>>`). The body is then parsed into the shape the caller
//! asked for, chosen by the `BodyShape` type parameter:
//!
//! | shape        | type          | empty body                         |
//! |--------------|---------------|------------------------------------|
//! | none         | `()`          | always `None`                      |
//! | raw bytes    | `Vec<u8>`     | `Some(vec![])`                     |
//! | text         | `String`      | `Some(String::new())`              |
//! | JSON object  | `JsonObject`  | `None` on 204/304, else parse error |
//! | JSON array   | `JsonArray`   | `None` on 204/304, else parse error |

use encoding_rs::Encoding;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http;

pub type JsonObject = serde_json::Map<String, Value>;
pub type JsonArray = Vec<Value>;

/// A response with its body as received.
pub type RawResponse = Response<Vec<u8>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub(crate) status: u16,
    pub(crate) message: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<T>,
}

impl<T> Response<T> {
    /// An empty response, before the server has answered.
    pub(crate) fn pending() -> Self {
        Self {
            status: 0,
            message: String::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub(crate) fn with_body<U>(self, body: Option<U>) -> Response<U> {
        Response {
            status: self.status,
            message: self.message,
            headers: self.headers,
            body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The reason phrase, e.g. `Not Found`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `404 Not Found`.
    pub fn status_line(&self) -> String {
        format!("{} {}", self.status, self.message).trim_end().to_string()
    }

    pub fn is_success(&self) -> bool {
        http::is_success(self.status)
    }

    /// Response headers in the order the transport returned them. A name
    /// that appeared several times has several entries.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(http::HDR_CONTENT_TYPE)
    }

    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<T> {
        self.body
    }
}

impl<T: BodyShape> Response<T> {
    /// Fail with `HttpStatus` unless the status is 2xx.
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let bytes = self.body.as_ref().map(T::to_bytes);
        Err(Error::http_status(self.with_body(bytes)))
    }
}

macro_rules! json_deserialize {
    ($($shape:ty),*) => {
        $(impl Response<$shape> {
            /// Deserialize the parsed JSON body into a concrete type.
            pub fn deserialize<D: DeserializeOwned>(&self) -> Result<D> {
                let body = self
                    .body
                    .clone()
                    .ok_or_else(|| Error::parse("no content to deserialize"))?;
                serde_json::from_value(Value::from(body)).map_err(|e| {
                    Error::parse(format!("body does not match target type: {e}")).with_source(e)
                })
            }
        })*
    };
}

json_deserialize!(JsonObject, JsonArray);

/// A result shape a response body can be parsed into.
pub trait BodyShape: Sized {
    /// JSON shapes make the executor send `Accept: application/json`.
    const JSON: bool = false;

    fn parse(raw: &[u8], status: u16, content_type: Option<&str>) -> Result<Option<Self>>;

    /// Bytes for an error snapshot of an already parsed body.
    fn to_bytes(&self) -> Vec<u8>;
}

impl BodyShape for () {
    fn parse(_: &[u8], _: u16, _: Option<&str>) -> Result<Option<Self>> {
        Ok(None)
    }

    fn to_bytes(&self) -> Vec<u8> {
        Vec::new()
    }
}

impl BodyShape for Vec<u8> {
    fn parse(raw: &[u8], _: u16, _: Option<&str>) -> Result<Option<Self>> {
        Ok(Some(raw.to_vec()))
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }
}

impl BodyShape for String {
    fn parse(raw: &[u8], _: u16, content_type: Option<&str>) -> Result<Option<Self>> {
        Ok(Some(decode_text(raw, content_type)))
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.clone().into_bytes()
    }
}

impl BodyShape for JsonObject {
    const JSON: bool = true;

    fn parse(raw: &[u8], status: u16, _: Option<&str>) -> Result<Option<Self>> {
        match parse_json(raw, status)? {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(Error::parse(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl BodyShape for JsonArray {
    const JSON: bool = true;

    fn parse(raw: &[u8], status: u16, _: Option<&str>) -> Result<Option<Self>> {
        match parse_json(raw, status)? {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(Error::parse(format!(
                "expected a JSON array, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

fn parse_json(raw: &[u8], status: u16) -> Result<Option<Value>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        if http::is_no_content(status) {
            return Ok(None);
        }
        return Err(Error::parse("no content to parse"));
    }
    serde_json::from_slice(raw).map(Some).map_err(|e| {
        let offset = byte_offset(raw, e.line(), e.column());
        Error::parse(format!("malformed JSON: {e}"))
            .with_offset(offset)
            .with_source(e)
    })
}

// serde_json reports 1-based line and column; turn them into an index.
fn byte_offset(raw: &[u8], line: usize, column: usize) -> Option<usize> {
    let line_start = match line {
        0 => return None,
        1 => 0,
        n => {
            raw.iter()
                .enumerate()
                .filter(|(_, b)| **b == b'\n')
                .nth(n - 2)?
                .0
                + 1
        }
    };
    Some((line_start + column.saturating_sub(1)).min(raw.len()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode_text(raw: &[u8], content_type: Option<&str>) -> String {
    let label = content_type.and_then(charset);
    match label.map(|l| (l, Encoding::for_label(l.as_bytes()))) {
        Some((_, Some(encoding))) => encoding.decode(raw).0.into_owned(),
        Some((label, None)) => {
            debug!(charset = label, "unknown charset, decoding as UTF-8");
            String::from_utf8_lossy(raw).into_owned()
        }
        None => String::from_utf8_lossy(raw).into_owned(),
    }
}

fn charset(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"'))
}
