use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, Upload, LATIN1_BODY};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_request() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo?q=a%20b")
                .header(http::header::CONTENT_TYPE, "application/json")
                .header("X-Trace", "1")
                .body(r#"{"k":1}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query.as_deref(), Some("q=a%20b"));
    assert_eq!(echo.headers["x-trace"], "1");
    assert_eq!(echo.content_type.as_deref(), Some("application/json"));
    assert_eq!(echo.json.unwrap()["k"], 1);
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(get("/status/404")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["reason"], "Not Found");
}

#[tokio::test]
async fn status_no_content_has_empty_body() {
    let resp = app().oneshot(get("/status/204")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn status_rejects_out_of_range_code() {
    let resp = app().oneshot(get("/status/1000")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- fixed bodies ---

#[tokio::test]
async fn empty_is_ok_without_body() {
    let resp = app().oneshot(get("/empty")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn latin1_declares_charset() {
    let resp = app().oneshot(get("/text/latin1")).await.unwrap();
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "text/plain; charset=iso-8859-1"
    );
    assert_eq!(&body_bytes(resp).await[..], LATIN1_BODY);
}

#[tokio::test]
async fn redirect_points_at_json_object() {
    let resp = app().oneshot(get("/redirect")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[http::header::LOCATION], "/json/object");
}

#[tokio::test]
async fn modified_honours_if_modified_since() {
    let resp = app().oneshot(get("/modified")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/modified")
                .header(http::header::IF_MODIFIED_SINCE, "Thu, 01 Jan 2015 00:00:00 GMT")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(resp).await.is_empty());
}

// --- uploads ---

#[tokio::test]
async fn get_upload_not_found() {
    let resp = app()
        .oneshot(get("/uploads/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("POST")
                .uri("/uploads")
                .body("0123456789".to_string())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let upload: Upload = body_json(resp).await;
    assert_eq!(upload.size, 10);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/uploads/{}", upload.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"0123456789");
}
