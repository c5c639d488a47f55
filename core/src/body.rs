//! Request payloads and their encoding.
//!
//! # Design
//! A payload is one of a fixed set of shapes. Each shape decides its own
//! bytes and default content type. Streams and files are not encoded up
//! front: they become a `StreamSource` that the executor opens and copies
//! while the call runs, so a large upload never sits in memory.
//!
//! Whether a payload streams follows from its variant, so a descriptor
//! cannot claim to stream an in-memory buffer or buffer a file.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::{APP_BINARY, APP_FORM, APP_JSON, TEXT_PLAIN};
use crate::uri;

/// The body of a POST or PUT request.
pub enum Payload {
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// A JSON object or array.
    Json(Value),
    /// UTF-8 text sent as `text/plain`.
    Text(String),
    Bytes(Vec<u8>),
    /// Copied to the connection in chunks; never buffered.
    Stream(Box<dyn Read + Send>),
    /// Opened for reading only when the call executes, closed when it ends.
    File(PathBuf),
}

impl Payload {
    /// JSON payload from any serializable value. Must serialize to an
    /// object or array.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| {
            Error::configuration(format!("payload is not serializable: {e}")).with_source(e)
        })?;
        Ok(Payload::Json(value))
    }

    pub fn form<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Payload::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Payload::Stream(_) | Payload::File(_))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Form(pairs) => f.debug_tuple("Form").field(pairs).finish(),
            Payload::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Payload::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Payload::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Payload::Stream(_) => f.write_str("Stream(..)"),
            Payload::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// A body source copied while the call runs.
pub enum StreamSource {
    Reader(Box<dyn Read + Send>),
    File(PathBuf),
}

impl StreamSource {
    /// Open the source. Files are opened here and nowhere earlier.
    pub(crate) fn open(self) -> io::Result<Box<dyn Read + Send>> {
        match self {
            StreamSource::Reader(reader) => Ok(reader),
            StreamSource::File(path) => Ok(Box::new(File::open(path)?)),
        }
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::Reader(_) => f.write_str("Reader(..)"),
            StreamSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

#[derive(Debug)]
pub enum EncodedBody {
    Buffered(Vec<u8>),
    Streamed(StreamSource),
}

/// An encoded payload plus the content type to use when the caller has not
/// set one.
#[derive(Debug)]
pub struct Encoded {
    pub body: EncodedBody,
    pub content_type: &'static str,
}

pub fn encode(payload: Payload, json_indent: i32) -> Result<Encoded> {
    let (body, content_type) = match payload {
        Payload::Form(pairs) => (
            EncodedBody::Buffered(uri::query_string(&pairs).into_bytes()),
            APP_FORM,
        ),
        Payload::Json(value) => (EncodedBody::Buffered(encode_json(&value, json_indent)?), APP_JSON),
        Payload::Text(text) => (EncodedBody::Buffered(text.into_bytes()), TEXT_PLAIN),
        Payload::Bytes(bytes) => (EncodedBody::Buffered(bytes), APP_BINARY),
        Payload::Stream(reader) => (EncodedBody::Streamed(StreamSource::Reader(reader)), APP_BINARY),
        Payload::File(path) => (EncodedBody::Streamed(StreamSource::File(path)), APP_BINARY),
    };
    Ok(Encoded { body, content_type })
}

/// Encode the body of a POST or PUT. Without a payload, query parameters
/// become a form body; a payload and parameters together are rejected.
pub fn encode_request_body(
    payload: Option<Payload>,
    params: &[(String, String)],
    json_indent: i32,
) -> Result<Option<Encoded>> {
    match payload {
        Some(_) if !params.is_empty() => Err(Error::configuration(
            "request has both a payload and form parameters",
        )),
        Some(payload) => encode(payload, json_indent).map(Some),
        None if params.is_empty() => Ok(None),
        None => encode(Payload::Form(params.to_vec()), json_indent).map(Some),
    }
}

pub fn encode_json(value: &Value, indent: i32) -> Result<Vec<u8>> {
    if !(value.is_object() || value.is_array()) {
        return Err(Error::configuration(
            "JSON payload must be an object or an array",
        ));
    }
    let bytes = match usize::try_from(indent) {
        Ok(width) if width > 0 => {
            let indent = vec![b' '; width];
            let mut out = Vec::new();
            let written = {
                let formatter = PrettyFormatter::with_indent(&indent);
                let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
                value.serialize(&mut ser)
            };
            written.map(|()| out)
        }
        _ => serde_json::to_vec(value),
    };
    bytes.map_err(|e| Error::configuration(format!("JSON encoding failed: {e}")).with_source(e))
}
