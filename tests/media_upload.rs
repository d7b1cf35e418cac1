mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use common::{body_json, build_app, config_with_media};

const BOUNDARY: &str = "------------------------testboundary";

fn multipart_request(path: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn register_body() -> Vec<u8> {
    multipart_body(
        &[
            ("fullName", "Alice Appleseed"),
            ("email", "alice@example.com"),
            ("username", "Alice"),
            ("password", "s3cret"),
        ],
        &[("avatar", "avatar.png", b"png bytes")],
    )
}

#[tokio::test]
async fn test_register_uploads_avatar_and_cleans_spool() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(r#"{"url": "http://media/hosted-avatar.png"}"#)
        .create_async()
        .await;

    let temp = tempfile::tempdir().unwrap();
    let (app, _state) = build_app(&config_with_media(
        &server.url(),
        temp.path().to_str().unwrap(),
    ))
    .await;

    let response = app
        .oneshot(multipart_request("/api/v1/users/register", register_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["avatar"], "http://media/hosted-avatar.png");
    assert!(body["data"].get("password").is_none());

    // The spooled upload was removed after shipping it to the media host.
    let leftovers = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_register_requires_all_fields() {
    let temp = tempfile::tempdir().unwrap();
    let (app, _state) = build_app(&config_with_media(
        "http://127.0.0.1:9",
        temp.path().to_str().unwrap(),
    ))
    .await;

    let body = multipart_body(
        &[("fullName", "Alice"), ("email", "alice@example.com")],
        &[("avatar", "avatar.png", b"png bytes")],
    );
    let response = app
        .oneshot(multipart_request("/api/v1/users/register", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(r#"{"url": "http://media/hosted-avatar.png"}"#)
        .create_async()
        .await;
    // The orphaned asset from the rejected registration gets deleted.
    let delete_mock = server
        .mock("POST", "/delete")
        .with_status(200)
        .create_async()
        .await;

    let temp = tempfile::tempdir().unwrap();
    let (app, _state) = build_app(&config_with_media(
        &server.url(),
        temp.path().to_str().unwrap(),
    ))
    .await;

    let response = app
        .clone()
        .oneshot(multipart_request("/api/v1/users/register", register_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(multipart_request("/api/v1/users/register", register_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    delete_mock.assert_async().await;
}

#[tokio::test]
async fn test_publish_video_records_duration_from_media_host() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(r#"{"url": "http://media/hosted.bin", "duration": 42.0}"#)
        .create_async()
        .await;

    let temp = tempfile::tempdir().unwrap();
    let (app, state) = build_app(&config_with_media(
        &server.url(),
        temp.path().to_str().unwrap(),
    ))
    .await;

    let alice = common::seed_user(&state, "alice", "pw").await;
    let token = common::access_token(&state, &alice);

    let body = multipart_body(
        &[("title", "my clip"), ("description", "a test clip")],
        &[
            ("videoFile", "clip.mp4", b"video bytes"),
            ("thumbnail", "thumb.png", b"png bytes"),
        ],
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/videos/publish")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], "my clip");
    assert_eq!(body["data"]["duration"], 42.0);
    assert_eq!(body["data"]["isPublished"], true);
    assert_eq!(body["data"]["views"], 0);
}

/// An unreachable media host fails the upload but never leaves the spooled
/// file behind.
#[tokio::test]
async fn test_unreachable_media_host_fails_registration() {
    let temp = tempfile::tempdir().unwrap();
    let (app, _state) = build_app(&config_with_media(
        "http://127.0.0.1:9",
        temp.path().to_str().unwrap(),
    ))
    .await;

    let response = app
        .oneshot(multipart_request("/api/v1/users/register", register_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let leftovers = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}
