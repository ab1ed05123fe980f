//! Common test utilities and fixtures for integration tests
//!
//! - Composed router over a shared `MockBackend`
//! - Account and invitation fixtures
//! - Request builders and response helpers

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use coachdesk_app::{create_app, AppSettings};
use coachdesk_backend::mock::MockBackend;
use coachdesk_backend::{BackendServices, InvitationRecord, InvitationStatus};
use coachdesk_common::Role;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "secret123";

/// Test application over an in-memory backend
pub struct TestApp {
    pub backend: MockBackend,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(AppSettings::default())
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        let backend = MockBackend::new();
        let services = BackendServices::from_shared(Arc::new(backend.clone()));
        Self {
            router: create_app(services, settings),
            backend,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Seed an account and hand back a bearer token for it
    pub fn account(&self, email: &str, role: Option<Role>) -> (Uuid, String) {
        let id = self.backend.seed_account(email, PASSWORD, role);
        let token = self.backend.issue_token(id);
        (id, token)
    }

    pub fn pending_invitation(&self, email: &str, role: Role, invited_by: Uuid) -> InvitationRecord {
        self.invitation(email, role, invited_by, InvitationStatus::Pending, 7)
    }

    pub fn invitation(
        &self,
        email: &str,
        role: Role,
        invited_by: Uuid,
        status: InvitationStatus,
        expires_in_days: i64,
    ) -> InvitationRecord {
        let record = InvitationRecord {
            id: Uuid::new_v4(),
            token: format!("tok{}", Uuid::new_v4().simple()),
            email: email.to_string(),
            role,
            status,
            expires_at: Utc::now() + chrono::Duration::days(expires_in_days),
            invited_by,
            created_at: Utc::now(),
        };
        self.backend.seed_invitation(record.clone());
        record
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, token, None)
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    request(Method::POST, uri, token, Some(body))
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Request carrying the session cookie instead of a bearer header
pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` pair of the first `Set-Cookie` header
pub fn session_cookie(headers: &HeaderMap) -> String {
    headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap_or_default()
        .to_string()
}

pub mod assertions {
    use super::*;

    pub fn assert_redirect(response: &Response, to: &str) {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok()),
            Some(to)
        );
    }

    pub async fn assert_error(response: Response, status: StatusCode, code: &str) {
        assert_eq!(response.status(), status);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], code);
    }
}
