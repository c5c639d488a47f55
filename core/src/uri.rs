//! URI composition and query-string encoding.
//!
//! Base URIs are prefixes, nothing more: `compose` concatenates without
//! normalising slashes or validating the result. The query string for GET
//! parameters is appended at execution time because parameters can be added
//! after the request was created.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::http::HttpMethod;

// Everything except RFC 3986 unreserved characters, so a space becomes %20.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn compose(base_uri: Option<&str>, path: &str) -> String {
    match base_uri {
        Some(base) => format!("{base}{path}"),
        None => path.to_string(),
    }
}

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// `k1=v1&k2=v2` with every key and value percent-encoded as UTF-8.
pub fn query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append `?query` for GET requests whose URI has no query yet.
pub fn with_query(method: HttpMethod, uri: &str, params: &[(String, String)]) -> String {
    if method != HttpMethod::Get || uri.contains('?') || params.is_empty() {
        return uri.to_string();
    }
    format!("{uri}?{}", query_string(params))
}

pub fn is_secure(uri: &str) -> bool {
    uri.get(..8)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
}
