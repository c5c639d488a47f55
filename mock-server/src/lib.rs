//! Fixture HTTP server used to exercise the client end to end.
//!
//! Every route produces one kind of response the client has to cope with:
//! echoes of what was sent, arbitrary status codes, empty bodies, non-UTF-8
//! text, redirects, slow replies, and a small upload store.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Map<String, Value>,
    pub content_type: Option<String>,
    pub body: String,
    pub json: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    pub size: usize,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Bytes>>>;

/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(2);

/// Body of `/text/latin1`: "café" encoded as ISO-8859-1.
pub const LATIN1_BODY: &[u8] = b"caf\xe9";

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/json/object", get(json_object))
        .route("/json/array", get(json_array))
        .route("/empty", get(empty))
        .route("/text/latin1", get(latin1))
        .route("/redirect", get(redirect))
        .route("/slow", get(slow))
        .route("/modified", get(modified))
        .route("/uploads", post(create_upload))
        .route("/uploads/{id}", get(get_upload))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let mut seen = Map::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match seen.get_mut(name.as_str()) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => {
                seen.insert(name.as_str().to_string(), Value::String(value));
            }
        }
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    tracing::debug!(%method, %uri, bytes = body.len(), "echo");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
        json: serde_json::from_slice(&body).ok(),
    })
}

async fn status(Path(code): Path<u16>) -> Result<Response, StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    if matches!(code, 204 | 304) {
        return Ok(status.into_response());
    }
    let reason = status.canonical_reason().unwrap_or("");
    Ok((status, Json(json!({ "status": code, "reason": reason }))).into_response())
}

async fn json_object() -> Json<Value> {
    Json(json!({ "name": "fixture", "count": 2, "tags": ["a", "b"] }))
}

async fn json_array() -> Json<Value> {
    Json(json!([1, "two", { "three": 3 }]))
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn latin1() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=iso-8859-1")],
        LATIN1_BODY,
    )
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/json/object")])
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({ "slow": true }))
}

async fn modified(headers: HeaderMap) -> Response {
    if headers.contains_key(header::IF_MODIFIED_SINCE) {
        return StatusCode::NOT_MODIFIED.into_response();
    }
    Json(json!({ "fresh": true })).into_response()
}

async fn create_upload(State(db): State<Db>, body: Bytes) -> (StatusCode, Json<Upload>) {
    let upload = Upload {
        id: Uuid::new_v4(),
        size: body.len(),
    };
    tracing::info!(id = %upload.id, size = upload.size, "stored upload");
    db.write().await.insert(upload.id, body);
    (StatusCode::CREATED, Json(upload))
}

async fn get_upload(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Response, StatusCode> {
    let uploads = db.read().await;
    let bytes = uploads.get(&id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}
