//! Attachment upload integration tests
//!
//! POST /v1/attachments - multipart `file` field, 10 MiB limit

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use coachdesk_backend::mock::MockOperation;
use coachdesk_common::Role;

use crate::common::{assertions, body_json, TestApp};

const MIB: usize = 1024 * 1024;
const BOUNDARY: &str = "integration-boundary";

fn upload(token: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
        BOUNDARY, file_name
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post("/v1/attachments")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_nine_mib_upload_returns_url_under_owner_prefix() {
    let app = TestApp::new();
    let (id, token) = app.account("client@example.com", Some(Role::Client));

    let response = app.send(upload(&token, "progress photo.png", &vec![3u8; 9 * MIB])).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let path = body["path"].as_str().unwrap_or_default().to_string();
    assert!(path.starts_with(&format!("{}/", id)));
    assert!(path.ends_with("-progress_photo.png"));
    assert_eq!(
        body["url"],
        format!("https://mock.storage.local/attachments/{}", path)
    );

    let stored = app.backend.stored_objects();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].size, 9 * MIB);
    assert_eq!(stored[0].bucket, "attachments");
}

#[tokio::test]
async fn test_eleven_mib_upload_rejected_locally() {
    let app = TestApp::new();
    let (_, token) = app.account("coach@example.com", Some(Role::Coach));

    let response = app.send(upload(&token, "video.mp4", &vec![0u8; 11 * MIB])).await;

    assertions::assert_error(response, StatusCode::PAYLOAD_TOO_LARGE, "ATTACHMENT_TOO_LARGE").await;
    assert_eq!(app.backend.calls(MockOperation::Upload), 0);
    assert!(app.backend.stored_objects().is_empty());
}

#[tokio::test]
async fn test_every_role_may_upload() {
    let app = TestApp::new();
    for (email, role) in [
        ("admin@example.com", Role::Admin),
        ("coach@example.com", Role::Coach),
        ("client@example.com", Role::Client),
    ] {
        let (_, token) = app.account(email, Some(role));
        let response = app.send(upload(&token, "note.txt", b"hello")).await;
        assert_eq!(response.status(), StatusCode::CREATED, "{}", role);
    }
    assert_eq!(app.backend.calls(MockOperation::Upload), 3);
}
