//! The seam between the executor and the network.
//!
//! # Design
//! The executor resolves everything a call needs (URI, merged headers,
//! timeouts, redirect and TLS policy, body) into a `TransportCall`. A
//! `Transport` then performs one blocking exchange: connect, send headers
//! and body, and read the full response. `UreqTransport` is the default.
//! Callers that need a different socket or TLS stack install their own with
//! `Client::set_transport`.
//!
//! The connection is owned by `send` and released when it returns, on every
//! path. The request body source is owned by the executor.

use std::fmt;
use std::io::{self, Read};
use std::time::Duration;

use tracing::{trace, warn};
use ureq::tls::{PemItem, RootCerts, TlsConfig};

use crate::error::BoxError;
use crate::http::{HttpMethod, DEFAULT_USER_AGENT};

/// Which server certificates to trust on `https` connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPolicy {
    /// The bundled web PKI roots.
    DefaultRoots,
    /// Only certificates chaining to these PEM-encoded roots.
    Certificates(Vec<Vec<u8>>),
    /// Any certificate. For test servers with self-signed certificates.
    AcceptAny,
}

/// Whether the certificate must match the host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostnamePolicy {
    Verify,
    AcceptAny,
}

/// TLS overrides for secure connections. Both halves are optional; an
/// unset half keeps the transport's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsPolicy {
    pub trust: Option<TrustPolicy>,
    pub hostnames: Option<HostnamePolicy>,
}

impl TlsPolicy {
    pub fn is_custom(&self) -> bool {
        self.trust.is_some() || self.hostnames.is_some()
    }
}

pub enum OutgoingBody<'a> {
    None,
    Buffered(&'a [u8]),
    Streamed(&'a mut dyn Read),
}

impl fmt::Debug for OutgoingBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutgoingBody::None => f.write_str("None"),
            OutgoingBody::Buffered(b) => write!(f, "Buffered({} bytes)", b.len()),
            OutgoingBody::Streamed(_) => f.write_str("Streamed(..)"),
        }
    }
}

/// One fully resolved exchange.
#[derive(Debug)]
pub struct TransportCall<'a> {
    pub method: HttpMethod,
    pub uri: &'a str,
    pub headers: &'a [(String, String)],
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub follow_redirects: bool,
    pub use_caches: bool,
    /// Present only for `https` URIs with a custom policy.
    pub tls: Option<&'a TlsPolicy>,
    pub body: OutgoingBody<'a>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub message: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportFailure {
    message: String,
    timeout: bool,
    #[source]
    source: Option<BoxError>,
}

impl TransportFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timeout: false,
            source: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            timeout: true,
            ..Self::new(message)
        }
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.timeout
    }
}

impl From<io::Error> for TransportFailure {
    fn from(e: io::Error) -> Self {
        let timeout = matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock);
        Self {
            message: e.to_string(),
            timeout,
            source: Some(Box::new(e)),
        }
    }
}

pub trait Transport: fmt::Debug + Send + Sync {
    fn send(&self, call: TransportCall<'_>) -> Result<TransportResponse, TransportFailure>;
}

/// Blocking transport on top of `ureq`, with a fresh agent per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

const MAX_REDIRECTS: u32 = 10;

impl Transport for UreqTransport {
    fn send(&self, call: TransportCall<'_>) -> Result<TransportResponse, TransportFailure> {
        let agent = agent_for(&call)?;
        if !call.use_caches {
            trace!("response caching disabled for this call");
        }

        let mut builder = ureq::http::Request::builder()
            .method(call.method.as_str())
            .uri(call.uri);
        for (name, value) in call.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = match call.body {
            OutgoingBody::None => agent.run(builder.body(()).map_err(invalid_request)?),
            OutgoingBody::Buffered(bytes) => agent.run(builder.body(bytes).map_err(invalid_request)?),
            OutgoingBody::Streamed(reader) => {
                let body = ureq::SendBody::from_reader(reader);
                agent.run(builder.body(body).map_err(invalid_request)?)
            }
        };
        let mut response = result.map_err(from_ureq)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(from_ureq)?;

        Ok(TransportResponse {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn agent_for(call: &TransportCall<'_>) -> Result<ureq::Agent, TransportFailure> {
    let mut config = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .user_agent(DEFAULT_USER_AGENT)
        .timeout_connect(Some(call.connect_timeout))
        .timeout_recv_response(Some(call.read_timeout))
        .timeout_recv_body(Some(call.read_timeout));

    config = if call.follow_redirects {
        config.max_redirects(MAX_REDIRECTS)
    } else {
        config.max_redirects(0).max_redirects_will_error(false)
    };

    if let Some(policy) = call.tls {
        config = config.tls_config(tls_config(policy)?);
    }
    Ok(config.build().new_agent())
}

fn tls_config(policy: &TlsPolicy) -> Result<TlsConfig, TransportFailure> {
    let mut builder = TlsConfig::builder();
    match &policy.trust {
        Some(TrustPolicy::Certificates(pems)) => {
            let mut roots = Vec::new();
            for pem in pems {
                for item in ureq::tls::parse_pem(pem) {
                    if let PemItem::Certificate(cert) = item.map_err(from_ureq)? {
                        roots.push(cert);
                    }
                }
            }
            if roots.is_empty() {
                return Err(TransportFailure::new("trust policy contains no certificates"));
            }
            builder = builder.root_certs(RootCerts::new_with_certs(&roots));
        }
        Some(TrustPolicy::AcceptAny) => builder = builder.disable_verification(true),
        Some(TrustPolicy::DefaultRoots) | None => {}
    }
    if policy.hostnames == Some(HostnamePolicy::AcceptAny) {
        // ureq cannot relax host name checks on their own.
        warn!("accepting any host name disables certificate verification");
        builder = builder.disable_verification(true);
    }
    Ok(builder.build())
}

fn invalid_request(e: ureq::http::Error) -> TransportFailure {
    TransportFailure::new(format!("invalid request: {e}")).with_source(e)
}

fn from_ureq(e: ureq::Error) -> TransportFailure {
    let timeout = match &e {
        ureq::Error::Timeout(_) => true,
        ureq::Error::Io(io) => matches!(io.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock),
        _ => false,
    };
    let failure = TransportFailure::new(e.to_string()).with_source(e);
    TransportFailure { timeout, ..failure }
}
