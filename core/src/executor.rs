//! One end-to-end call: resolve, send, read, check, parse.
//!
//! # Design
//! `execute` runs on the caller's thread and makes exactly one attempt.
//! Every failure leaves as a typed `Error`: configuration problems before
//! any I/O, transport failures wrapped as `Kind::Transport`, and status or
//! parse failures with the response attached. Errors that are already typed
//! pass through `?` unchanged.
//!
//! Resources are scoped. A streamed body source (caller stream or file) is
//! a local of `exchange` and is dropped, which closes it, whether the copy
//! finished or not. The transport owns the connection for the duration of
//! `send`.

use std::io::{self, Read};
use std::time::Instant;

use tracing::{debug, trace};

use crate::body::{self, EncodedBody};
use crate::client::Client;
use crate::config::{first_present, GlobalConfig};
use crate::error::{Error, Result};
use crate::headers::{self, http_date};
use crate::http::{APP_JSON, HDR_ACCEPT, HDR_CONTENT_TYPE, HDR_IF_MODIFIED_SINCE};
use crate::request::RequestDescriptor;
use crate::response::{BodyShape, RawResponse, Response};
use crate::transport::{OutgoingBody, TransportCall, TransportFailure};
use crate::uri;

/// Largest single read from a streamed body source.
pub const CHUNK_SIZE: usize = 8 * 1024;

pub(crate) fn execute<T: BodyShape>(
    client: &Client,
    request: RequestDescriptor,
) -> Result<Response<T>> {
    let started = Instant::now();
    let settings = client.context().snapshot();
    let uri = uri::with_query(request.method, &request.uri, &request.params);
    debug!(method = %request.method, uri = %uri, "sending request");

    let mut response = RawResponse::pending();
    let ensure_success = request.ensure_success;
    exchange::<T>(client, &settings, &uri, request, &mut response)?;

    debug!(
        status = response.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );

    if ensure_success && !response.is_success() {
        return Err(Error::http_status(response));
    }

    let content_type = response.content_type().map(str::to_string);
    let raw = response.body.as_deref().unwrap_or_default();
    match T::parse(raw, response.status, content_type.as_deref()) {
        Ok(body) => Ok(response.with_body(body)),
        Err(e) => Err(e.with_response(response)),
    }
}

/// Steps from connection setup to the fully read response.
fn exchange<T: BodyShape>(
    client: &Client,
    settings: &GlobalConfig,
    uri: &str,
    request: RequestDescriptor,
    response: &mut RawResponse,
) -> Result<()> {
    let RequestDescriptor {
        method,
        headers: request_headers,
        params,
        payload,
        connect_timeout,
        read_timeout,
        if_modified_since,
        use_caches,
        ..
    } = request;

    let tls = Some(client.tls_policy()).filter(|p| p.is_custom() && uri::is_secure(uri));

    let connect_timeout = first_present([connect_timeout, client.connect_timeout()])
        .unwrap_or(settings.connect_timeout);
    let read_timeout =
        first_present([read_timeout, client.read_timeout()]).unwrap_or(settings.read_timeout);

    let merged = headers::merge(
        Some(&settings.headers),
        Some(client.default_headers()),
        Some(&request_headers),
    );
    let mut wire_headers = headers::render(&merged)?;
    if let Some(since) = if_modified_since {
        headers::ensure(&mut wire_headers, HDR_IF_MODIFIED_SINCE, &http_date(&since));
    }
    if T::JSON {
        headers::ensure(&mut wire_headers, HDR_ACCEPT, APP_JSON);
    }

    let encoded = if method.allows_body() {
        body::encode_request_body(payload, &params, settings.json_indent)?
    } else if payload.is_some() {
        return Err(Error::configuration(format!(
            "{method} requests cannot carry a payload"
        )));
    } else {
        None
    };
    if let Some(encoded) = &encoded {
        headers::ensure(&mut wire_headers, HDR_CONTENT_TYPE, encoded.content_type);
    }
    trace!(headers = ?wire_headers, "merged request headers");

    let mut buffered = None;
    let mut source = None;
    match encoded.map(|e| e.body) {
        Some(EncodedBody::Buffered(bytes)) => buffered = Some(bytes),
        Some(EncodedBody::Streamed(stream)) => {
            let opened = stream
                .open()
                .map_err(|e| Error::transport(format!("cannot open request body: {e}"), e))?;
            source = Some(opened);
        }
        None => {}
    }
    let mut chunked = source.as_mut().map(|s| Chunked::new(s.as_mut()));
    let body = match (&buffered, &mut chunked) {
        (Some(bytes), _) => OutgoingBody::Buffered(bytes),
        (None, Some(chunked)) => OutgoingBody::Streamed(chunked),
        (None, None) => OutgoingBody::None,
    };

    let sent = client.transport().send(TransportCall {
        method,
        uri,
        headers: &wire_headers,
        connect_timeout,
        read_timeout,
        follow_redirects: client.follow_redirects(),
        use_caches,
        tls,
        body,
    });
    if let Some(chunked) = &chunked {
        trace!(bytes = chunked.copied, "streamed request body");
    }
    let reply = sent.map_err(transport_error)?;

    response.status = reply.status;
    response.message = reply.message;
    response.headers = reply.headers;
    response.body = Some(reply.body);
    Ok(())
}

fn transport_error(failure: TransportFailure) -> Error {
    let timeout = failure.is_timeout();
    Error::transport(failure.to_string(), failure).with_timeout(timeout)
}

/// Caps each read at `CHUNK_SIZE` and counts what was copied.
struct Chunked<'a> {
    inner: &'a mut (dyn Read + Send),
    copied: u64,
}

impl<'a> Chunked<'a> {
    fn new(inner: &'a mut (dyn Read + Send)) -> Self {
        Self { inner, copied: 0 }
    }
}

impl Read for Chunked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(CHUNK_SIZE);
        let n = self.inner.read(&mut buf[..len])?;
        self.copied += n as u64;
        Ok(n)
    }
}
