//! Synchronous client core for JSON REST APIs.
//!
//! # Overview
//! A `Client` creates requests, a `RequestBuilder` collects headers,
//! parameters, a payload and timeouts, and one of the `as_*` methods runs the
//! call on the current thread and parses the body into the chosen shape:
//! nothing, raw bytes, text, a JSON object or a JSON array.
//!
//! ```no_run
//! use jsonrest_core::Client;
//!
//! let mut client = Client::new();
//! client.set_base_uri("https://api.example.com");
//! let todos = client.get("/todos").param("done", false).as_json_array()?;
//! println!("{} -> {:?}", todos.status_line(), todos.body());
//! # Ok::<(), jsonrest_core::Error>(())
//! ```
//!
//! # Design
//! - Configuration has three layers: process-wide (`Context`), per client,
//!   and per request. The most specific value present wins.
//! - Every failure is an `Error` with one of four `Kind`s. Status and parse
//!   failures carry the response so callers can inspect what came back.
//! - The network sits behind the `Transport` trait; `UreqTransport` is the
//!   default and tests substitute a scripted one.
//! - Streamed and file bodies are copied in fixed-size chunks and the
//!   underlying reader is closed on every exit path.

pub mod body;
pub mod client;
pub mod config;
pub mod error;
mod executor;
pub mod headers;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;
pub mod uri;

pub use body::Payload;
pub use client::Client;
pub use config::{first_present, Context, GlobalConfig};
pub use error::{Error, Kind, Result};
pub use executor::CHUNK_SIZE;
pub use headers::{HeaderSet, HeaderValue};
pub use http::HttpMethod;
pub use request::{RequestBuilder, RequestDescriptor};
pub use response::{BodyShape, JsonArray, JsonObject, RawResponse, Response};
pub use transport::{
    HostnamePolicy, OutgoingBody, TlsPolicy, Transport, TransportCall, TransportFailure,
    TransportResponse, TrustPolicy, UreqTransport,
};
