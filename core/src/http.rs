//! HTTP vocabulary shared by the request and response sides.
//!
//! # Design
//! Only the four methods a JSON REST service needs are modelled. Header
//! names and MIME types used by the executor live here as constants so the
//! encoder, executor, and transport agree on spelling.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a request body may be sent with this method.
    pub fn allows_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_USER_AGENT: &str = concat!("jsonrest/", env!("CARGO_PKG_VERSION"));

pub const APP_FORM: &str = "application/x-www-form-urlencoded";
pub const APP_JSON: &str = "application/json";
pub const APP_BINARY: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain";

pub const HDR_CONTENT_TYPE: &str = "Content-Type";
pub const HDR_ACCEPT: &str = "Accept";
pub const HDR_USER_AGENT: &str = "User-Agent";
pub const HDR_AUTHORIZATION: &str = "Authorization";
pub const HDR_IF_MODIFIED_SINCE: &str = "If-Modified-Since";

/// True for 200..=299.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Statuses that never carry a body: 204 No Content and 304 Not Modified.
pub fn is_no_content(status: u16) -> bool {
    status == 204 || status == 304
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_post_and_put_carry_bodies() {
        assert!(!HttpMethod::Get.allows_body());
        assert!(HttpMethod::Post.allows_body());
        assert!(HttpMethod::Put.allows_body());
        assert!(!HttpMethod::Delete.allows_body());
    }

    #[test]
    fn success_range_is_inclusive() {
        assert!(!is_success(199));
        assert!(is_success(200));
        assert!(is_success(299));
        assert!(!is_success(300));
        assert!(!is_success(404));
    }
}
