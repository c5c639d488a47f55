//! End-to-end calls against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port and talks to it through
//! the default `ureq` transport, so header merging, body encoding, status
//! handling and parsing are checked over real HTTP.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use jsonrest_core::{Client, Context, Kind};
use serde_json::json;

fn spawn_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// A client with its own context pointed at a fresh server.
fn client() -> Client {
    let context = Arc::new(Context::new());
    context.set_base_uri(Some(spawn_server()));
    Client::with_context(context)
}

#[test]
fn headers_merge_across_layers_and_query_is_encoded() {
    let mut client = client();
    client.context().set_header("X-Global", "g");
    client.context().set_header("X-Shared", "global");
    client.set_default_header("X-Shared", "client");
    client.set_default_header("X-Client", 7);

    let echo = client
        .get("/echo")
        .header("X-Client", "request")
        .param("q", "a b")
        .param("n", 1)
        .as_json_object()
        .unwrap();

    assert_eq!(echo.status(), 200);
    let body = echo.body().unwrap();
    assert_eq!(body["method"], "GET");
    assert_eq!(body["query"], "q=a%20b&n=1");
    let headers = body["headers"].as_object().unwrap();
    assert_eq!(headers["x-global"], "g");
    assert_eq!(headers["x-shared"], "client");
    assert_eq!(headers["x-client"], "request");
    assert_eq!(headers["accept"], "application/json");
}

#[test]
fn json_payload_is_sent_with_content_type() {
    let client = client();
    let echo = client
        .post("/echo")
        .json(json!({ "title": "write tests", "done": false }))
        .as_json_object()
        .unwrap();

    let body = echo.body().unwrap();
    assert_eq!(body["method"], "POST");
    assert_eq!(body["content_type"], "application/json");
    assert_eq!(body["json"]["title"], "write tests");
}

#[test]
fn indent_factor_shapes_the_json_text() {
    let client = client();
    client.context().set_json_indent_factor(2);
    let echo = client
        .put("/echo")
        .json(json!({ "a": 1 }))
        .as_json_object()
        .unwrap();
    assert_eq!(echo.body().unwrap()["body"], "{\n  \"a\": 1\n}");
}

#[test]
fn params_become_a_form_body_on_post() {
    let client = client();
    let echo = client
        .post("/echo")
        .param("name", "x y")
        .param("n", 2)
        .as_json_object()
        .unwrap();

    let body = echo.body().unwrap();
    assert_eq!(body["content_type"], "application/x-www-form-urlencoded");
    assert_eq!(body["body"], "name=x%20y&n=2");
    assert!(body["query"].is_null());
}

#[test]
fn error_status_is_data_unless_success_is_required() {
    let client = client();

    let resp = client.get("/status/404").as_json_object().unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.status_line(), "404 Not Found");
    assert_eq!(resp.body().unwrap()["reason"], "Not Found");

    let err = client
        .get("/status/404")
        .ensure_success()
        .as_json_object()
        .unwrap_err();
    assert_eq!(err.kind(), Kind::HttpStatus);
    let raw = err.into_response().unwrap();
    assert_eq!(raw.status(), 404);
    assert!(!raw.body().unwrap().is_empty());
}

#[test]
fn no_content_parses_to_none_but_empty_ok_is_an_error() {
    let client = client();

    let resp = client.delete("/status/204").as_json_object().unwrap();
    assert_eq!(resp.status(), 204);
    assert!(resp.body().is_none());

    let err = client.get("/empty").as_json_object().unwrap_err();
    assert_eq!(err.kind(), Kind::Parse);
    assert_eq!(err.response().unwrap().status(), 200);

    let resp = client.get("/empty").as_void().unwrap();
    assert!(resp.body().is_none());
}

#[test]
fn json_array_and_shape_mismatch() {
    let client = client();

    let resp = client.get("/json/array").as_json_array().unwrap();
    assert_eq!(resp.body().unwrap().len(), 3);

    let err = client.get("/json/array").as_json_object().unwrap_err();
    assert_eq!(err.kind(), Kind::Parse);
}

#[test]
fn redirects_are_returned_unless_following_is_enabled() {
    let mut client = client();

    let resp = client.get("/redirect").as_void().unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.header("location"), Some("/json/object"));

    client.set_follow_redirects(true);
    let resp = client.get("/redirect").as_json_object().unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.body().unwrap()["name"], "fixture");
}

#[test]
fn slow_response_hits_the_read_timeout() {
    let client = client();
    let err = client
        .get("/slow")
        .read_timeout(Duration::from_millis(200))
        .as_json_object()
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Transport);
    assert!(err.is_timeout());
}

#[test]
fn uploaded_file_can_be_downloaded_again() {
    let client = client();
    let contents: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&contents).unwrap();
    file.flush().unwrap();

    let created = client
        .post("/uploads")
        .file(file.path())
        .ensure_success()
        .as_json_object()
        .unwrap();
    assert_eq!(created.status(), 201);
    let body = created.body().unwrap();
    assert_eq!(body["size"], 20_000);

    let id = body["id"].as_str().unwrap();
    let fetched = client.get(&format!("/uploads/{id}")).as_bytes().unwrap();
    assert_eq!(fetched.body().unwrap(), &contents);
}

#[test]
fn streamed_body_is_uploaded() {
    let client = client();
    let created = client
        .post("/uploads")
        .stream(std::io::Cursor::new(vec![7u8; 9_000]))
        .as_json_object()
        .unwrap();
    assert_eq!(created.body().unwrap()["size"], 9_000);
}

#[test]
fn text_is_decoded_with_the_declared_charset() {
    let client = client();
    let resp = client.get("/text/latin1").as_string().unwrap();
    assert_eq!(resp.body().map(String::as_str), Some("café"));
}

#[test]
fn if_modified_since_yields_not_modified() {
    let client = client();

    let fresh = client.get("/modified").as_json_object().unwrap();
    assert_eq!(fresh.body().unwrap()["fresh"], true);

    let since = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
    let resp = client
        .get("/modified")
        .if_modified_since(since)
        .as_json_object()
        .unwrap();
    assert_eq!(resp.status(), 304);
    assert!(resp.body().is_none());
}

#[test]
fn connection_refused_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::with_context(Arc::new(Context::new()));
    let err = client
        .get(&format!("http://{addr}/echo"))
        .connect_timeout(Duration::from_secs(2))
        .as_void()
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Transport);
    assert!(err.response().is_none());
}

#[test]
fn configuration_errors_happen_before_any_io() {
    let client = client();
    let err = client
        .post("/echo")
        .json(json!(42))
        .as_json_object()
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Configuration);

    let err = client
        .get("/echo")
        .header("Bad Name", "x")
        .as_json_object()
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Configuration);
}
