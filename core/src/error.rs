//! Error type for every stage of a call.
//!
//! # Design
//! Every failure crosses the public boundary as a single `Error` tagged with
//! one of four `Kind`s. Lower-level causes are kept as the `source`. When the
//! server had already answered, a raw snapshot of the response (status,
//! headers, body bytes) is attached so callers can still inspect it after a
//! status check or body parse failed.

use std::fmt;

use crate::response::RawResponse;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

/// The category of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Caller bug: unsupported header value, bad method/payload combination.
    Configuration,
    /// DNS, connect, I/O, TLS, or timeout failure.
    Transport,
    /// The exchange completed but the status was outside 200..=299 and
    /// success was required.
    HttpStatus,
    /// A structured body was malformed or missing.
    Parse,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Configuration => "configuration",
            Kind::Transport => "transport",
            Kind::HttpStatus => "http status",
            Kind::Parse => "parse",
        })
    }
}

/// A failed call.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: Kind,
    message: String,
    #[source]
    source: Option<BoxError>,
    response: Option<Box<RawResponse>>,
    timeout: bool,
    offset: Option<usize>,
}

impl Error {
    fn new(kind: Kind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            response: None,
            timeout: false,
            offset: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(Kind::Configuration, message)
    }

    pub fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::new(Kind::Transport, message).with_source(source)
    }

    /// Status-check failure. The response is always attached.
    pub fn http_status(response: RawResponse) -> Self {
        let message = format!("unexpected status {}", response.status_line());
        Self::new(Kind::HttpStatus, message).with_response(response)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(Kind::Parse, message)
    }

    pub(crate) fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn with_response(mut self, response: RawResponse) -> Self {
        self.response = Some(Box::new(response));
        self
    }

    pub(crate) fn with_timeout(mut self, timeout: bool) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn with_offset(mut self, offset: Option<usize>) -> Self {
        self.offset = offset;
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The response as it stood when the call failed, if the server answered.
    pub fn response(&self) -> Option<&RawResponse> {
        self.response.as_deref()
    }

    pub fn into_response(self) -> Option<RawResponse> {
        self.response.map(|r| *r)
    }

    /// True when a connect or read timeout expired.
    pub fn is_timeout(&self) -> bool {
        self.timeout
    }

    /// Byte offset of a JSON syntax error in the response body, when known.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = Error::configuration("header 'X' has unsupported value");
        assert_eq!(
            err.to_string(),
            "configuration error: header 'X' has unsupported value"
        );
    }

    #[test]
    fn transport_error_keeps_its_cause() {
        let cause = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::transport("connect failed", cause);
        assert_eq!(err.kind(), Kind::Transport);
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("refused"));
        assert!(err.response().is_none());
        assert!(!err.is_timeout());
    }

    #[test]
    fn http_status_error_carries_response() {
        let mut response = RawResponse::pending();
        response.status = 503;
        response.message = "Service Unavailable".to_string();
        let err = Error::http_status(response);
        assert_eq!(err.kind(), Kind::HttpStatus);
        assert_eq!(err.response().map(|r| r.status()), Some(503));
        assert!(err.message().contains("503"));
    }
}
