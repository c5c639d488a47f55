//! Process-wide configuration shared by every `Client`.
//!
//! # Design
//! `Context` holds the process-level settings: headers, base URI, timeouts
//! and the JSON indent factor. It is an
//! explicit value, shared through `Arc` and read by snapshot at call time.
//! `Context::global()` is the lazily created process-wide instance that
//! `Client::new` uses; tests and embedders can build isolated ones.
//!
//! Writers take the lock per field update. A call that snapshots while
//! another thread is reconfiguring sees either the old or the new value of
//! each field, never a torn one, but may mix old and new fields.

use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::headers::{HeaderSet, HeaderValue};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Indent factor meaning single-line JSON.
pub const COMPACT_JSON: i32 = -1;

/// A point-in-time copy of the process-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    pub headers: HeaderSet,
    pub base_uri: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Spaces per nesting level for JSON request bodies; below 1 is compact.
    pub json_indent: i32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            headers: HeaderSet::new(),
            base_uri: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            json_indent: COMPACT_JSON,
        }
    }
}

#[derive(Debug, Default)]
pub struct Context {
    inner: RwLock<GlobalConfig>,
}

static GLOBAL: OnceLock<Arc<Context>> = OnceLock::new();

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GlobalConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    /// The process-wide context.
    pub fn global() -> Arc<Context> {
        GLOBAL.get_or_init(|| Arc::new(Context::new())).clone()
    }

    pub fn snapshot(&self) -> GlobalConfig {
        self.read().clone()
    }

    pub fn set_header(&self, name: impl Into<String>, value: impl Into<HeaderValue>) {
        self.write().headers.insert(name, value);
    }

    pub fn remove_header(&self, name: &str) {
        self.write().headers.remove(name);
    }

    pub fn set_base_uri(&self, base_uri: Option<String>) {
        self.write().base_uri = base_uri;
    }

    pub fn base_uri(&self) -> Option<String> {
        self.read().base_uri.clone()
    }

    pub fn set_connect_timeout(&self, timeout: Duration) {
        self.write().connect_timeout = timeout;
    }

    pub fn set_read_timeout(&self, timeout: Duration) {
        self.write().read_timeout = timeout;
    }

    pub fn set_json_indent_factor(&self, indent: i32) {
        self.write().json_indent = indent;
    }

    // A panicking writer cannot leave a field half-written, so poisoning
    // is ignored.
    fn read(&self) -> RwLockReadGuard<'_, GlobalConfig> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GlobalConfig> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// First `Some` in precedence order.
///
/// Used wherever a request-level, instance-level, and process-level value
/// compete: base URI, connect timeout, read timeout.
pub fn first_present<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}
