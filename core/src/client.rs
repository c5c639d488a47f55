//! Client instances: per-instance configuration and request creation.
//!
//! # Design
//! A `Client` layers its own settings over the shared `Context`: a base URI
//! that replaces the global one, default headers that override global
//! headers, TLS overrides, redirect policy, optional timeouts, and the
//! transport. Setters take `&mut self` and requests borrow `&self`, so a
//! client cannot be reconfigured while a request built from it is alive.
//! Share a client across threads behind `Arc` once it is configured.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{first_present, Context};
use crate::error::Result;
use crate::executor;
use crate::headers::{HeaderSet, HeaderValue};
use crate::http::HttpMethod;
use crate::request::{RequestBuilder, RequestDescriptor};
use crate::response::{BodyShape, Response};
use crate::transport::{HostnamePolicy, TlsPolicy, Transport, TrustPolicy, UreqTransport};
use crate::uri;

#[derive(Debug, Clone)]
pub struct Client {
    context: Arc<Context>,
    base_uri: Option<String>,
    headers: HeaderSet,
    tls: TlsPolicy,
    follow_redirects: bool,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    transport: Arc<dyn Transport>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// A client bound to the process-wide `Context`.
    pub fn new() -> Self {
        Self::with_context(Context::global())
    }

    pub fn with_context(context: Arc<Context>) -> Self {
        Self {
            context,
            base_uri: None,
            headers: HeaderSet::new(),
            tls: TlsPolicy::default(),
            follow_redirects: false,
            connect_timeout: None,
            read_timeout: None,
            transport: Arc::new(UreqTransport),
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Prefix for every URI created from now on. Takes precedence over the
    /// global base URI.
    pub fn set_base_uri(&mut self, base_uri: impl Into<String>) {
        self.base_uri = Some(base_uri.into());
    }

    /// Fall back to the global base URI again.
    pub fn clear_base_uri(&mut self) {
        self.base_uri = None;
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    pub fn set_default_header(&mut self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        self.headers.insert(name, value);
    }

    /// Remove an instance header, letting a global value show through.
    pub fn remove_default_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn default_headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn set_trust_policy(&mut self, trust: Option<TrustPolicy>) {
        self.tls.trust = trust;
    }

    pub fn set_hostname_policy(&mut self, hostnames: Option<HostnamePolicy>) {
        self.tls.hostnames = hostnames;
    }

    pub fn tls_policy(&self) -> &TlsPolicy {
        &self.tls
    }

    /// Off by default: 3xx responses are returned to the caller as-is.
    pub fn set_follow_redirects(&mut self, follow: bool) {
        self.follow_redirects = follow;
    }

    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }

    pub fn set_connect_timeout(&mut self, timeout: Option<Duration>) {
        self.connect_timeout = timeout;
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = transport;
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn get(&self, path_or_uri: &str) -> RequestBuilder<'_> {
        self.request(HttpMethod::Get, path_or_uri)
    }

    pub fn post(&self, path_or_uri: &str) -> RequestBuilder<'_> {
        self.request(HttpMethod::Post, path_or_uri)
    }

    pub fn put(&self, path_or_uri: &str) -> RequestBuilder<'_> {
        self.request(HttpMethod::Put, path_or_uri)
    }

    pub fn delete(&self, path_or_uri: &str) -> RequestBuilder<'_> {
        self.request(HttpMethod::Delete, path_or_uri)
    }

    /// Start a request. The base URI in effect now is prefixed to
    /// `path_or_uri` without any normalisation.
    pub fn request(&self, method: HttpMethod, path_or_uri: &str) -> RequestBuilder<'_> {
        let base = first_present([self.base_uri.clone(), self.context.base_uri()]);
        RequestBuilder::new(self, method, uri::compose(base.as_deref(), path_or_uri))
    }

    /// Run a prepared descriptor, parsing the body into `T`.
    pub fn execute<T: BodyShape>(&self, request: RequestDescriptor) -> Result<Response<T>> {
        executor::execute(self, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isolated() -> Client {
        Client::with_context(Arc::new(Context::new()))
    }

    #[test]
    fn defaults() {
        let client = isolated();
        assert!(client.base_uri().is_none());
        assert!(client.default_headers().is_empty());
        assert!(!client.tls_policy().is_custom());
        assert!(!client.follow_redirects());
        assert!(client.connect_timeout().is_none());
        assert!(client.read_timeout().is_none());
    }

    #[test]
    fn uri_is_composed_when_the_request_is_created() {
        let mut client = isolated();
        client.context().set_base_uri(Some("http://global".into()));
        assert_eq!(client.get("/a").descriptor().uri(), "http://global/a");

        client.set_base_uri("http://mine");
        let request = client.get("/a").into_descriptor();
        client.context().set_base_uri(None);
        assert_eq!(request.uri(), "http://mine/a");
    }

    #[test]
    fn method_helpers_set_the_method() {
        let client = isolated();
        assert_eq!(client.get("/").descriptor().method(), HttpMethod::Get);
        assert_eq!(client.post("/").descriptor().method(), HttpMethod::Post);
        assert_eq!(client.put("/").descriptor().method(), HttpMethod::Put);
        assert_eq!(client.delete("/").descriptor().method(), HttpMethod::Delete);
    }

    #[test]
    fn removing_instance_header_restores_fallthrough() {
        let mut client = isolated();
        client.set_default_header("X-Client", "a");
        client.remove_default_header("X-Client");
        assert!(client.default_headers().get("X-Client").is_none());
    }
}
