//! Request descriptors and the builder that produces them.
//!
//! A `RequestBuilder` borrows the `Client` it came from, so instance
//! configuration cannot change while a request derived from it is being
//! built or executed. Calling one of the `as_*` methods consumes the builder
//! and runs the call on the current thread.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::body::Payload;
use crate::client::Client;
use crate::error::Result;
use crate::headers::{HeaderSet, HeaderValue};
use crate::http::HttpMethod;
use crate::response::{BodyShape, JsonArray, JsonObject, Response};

/// Everything needed to perform one call.
#[derive(Debug)]
pub struct RequestDescriptor {
    pub(crate) method: HttpMethod,
    pub(crate) uri: String,
    pub(crate) headers: HeaderSet,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) payload: Option<Payload>,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) if_modified_since: Option<DateTime<Utc>>,
    pub(crate) use_caches: bool,
    pub(crate) ensure_success: bool,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: HeaderSet::new(),
            params: Vec::new(),
            payload: None,
            connect_timeout: None,
            read_timeout: None,
            if_modified_since: None,
            use_caches: false,
            ensure_success: false,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The URI after base-URI composition, without the GET query string.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// True when the body is copied from a stream or file during the call.
    pub fn streaming(&self) -> bool {
        self.payload.as_ref().is_some_and(Payload::is_streaming)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn if_modified_since(&self) -> Option<DateTime<Utc>> {
        self.if_modified_since
    }

    pub fn use_caches(&self) -> bool {
        self.use_caches
    }

    pub fn ensure_success(&self) -> bool {
        self.ensure_success
    }
}

#[must_use = "a request does nothing until one of the `as_*` methods runs it"]
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    descriptor: RequestDescriptor,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(client: &'a Client, method: HttpMethod, uri: String) -> Self {
        Self {
            client,
            descriptor: RequestDescriptor::new(method, uri),
        }
    }

    /// Set a request header. Request headers override client and global
    /// headers with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.descriptor.headers.insert(name, value);
        self
    }

    /// Set or clear a request header; `None` removes it.
    pub fn header_opt(mut self, name: impl Into<String>, value: Option<HeaderValue>) -> Self {
        self.descriptor.headers.set(name, value);
        self
    }

    /// Add a query parameter (GET) or form field (POST/PUT without payload).
    /// Repeated names are sent repeatedly, in order.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.descriptor.params.push((name.into(), value.to_string()));
        self
    }

    pub fn params<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.descriptor
            .params
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    pub fn body(mut self, payload: Payload) -> Self {
        self.descriptor.payload = Some(payload);
        self
    }

    pub fn json(self, value: Value) -> Self {
        self.body(Payload::Json(value))
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(Payload::Text(text.into()))
    }

    pub fn bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body(Payload::Bytes(bytes.into()))
    }

    pub fn stream(self, reader: impl Read + Send + 'static) -> Self {
        self.body(Payload::Stream(Box::new(reader)))
    }

    /// Upload a file. It is opened when the call runs, not now.
    pub fn file(self, path: impl Into<PathBuf>) -> Self {
        self.body(Payload::File(path.into()))
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.descriptor.connect_timeout = Some(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.descriptor.read_timeout = Some(timeout);
        self
    }

    pub fn if_modified_since(mut self, at: DateTime<Utc>) -> Self {
        self.descriptor.if_modified_since = Some(at);
        self
    }

    pub fn use_caches(mut self, use_caches: bool) -> Self {
        self.descriptor.use_caches = use_caches;
        self
    }

    /// Fail with `Kind::HttpStatus` unless the response status is 2xx.
    pub fn ensure_success(mut self) -> Self {
        self.descriptor.ensure_success = true;
        self
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    pub fn into_descriptor(self) -> RequestDescriptor {
        self.descriptor
    }

    /// Run the call, parsing the body into `T`.
    pub fn execute<T: BodyShape>(self) -> Result<Response<T>> {
        self.client.execute(self.descriptor)
    }

    pub fn as_void(self) -> Result<Response<()>> {
        self.execute()
    }

    pub fn as_bytes(self) -> Result<Response<Vec<u8>>> {
        self.execute()
    }

    pub fn as_string(self) -> Result<Response<String>> {
        self.execute()
    }

    pub fn as_json_object(self) -> Result<Response<JsonObject>> {
        self.execute()
    }

    pub fn as_json_array(self) -> Result<Response<JsonArray>> {
        self.execute()
    }
}
