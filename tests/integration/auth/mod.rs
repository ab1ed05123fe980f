//! Session endpoint integration tests
//!
//! - GET /login - Flow resolution
//! - POST /v1/auth/setup-admin - First-run administrator
//! - POST /v1/auth/sign-in, POST /v1/auth/sign-out
//! - GET /v1/auth/session

use std::time::Duration;

use axum::http::{header, StatusCode};
use coachdesk_backend::mock::MockOperation;
use coachdesk_backend::BackendError;
use coachdesk_common::Role;
use serde_json::json;

use crate::common::{
    assertions, body_json, get, get_with_cookie, post_json, session_cookie, TestApp, PASSWORD,
};

mod test_first_run {
    use super::*;

    #[tokio::test]
    async fn test_setup_admin_then_land_on_admin_home() {
        let app = TestApp::new();

        let login = app.send(get("/login", None)).await;
        assert_eq!(login.status(), StatusCode::OK);
        assert_eq!(body_json(login).await["state"], "setup-admin");

        let created = app
            .send(post_json(
                "/v1/auth/setup-admin",
                None,
                json!({ "email": "owner@example.com", "password": PASSWORD, "full_name": "Olive Owner" }),
            ))
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let cookie = session_cookie(created.headers());
        let body = body_json(created).await;
        assert_eq!(body["redirect_to"], "/admin");
        assert_eq!(body["user"]["full_name"], "Olive Owner");
        assert_eq!(body["flags"]["is_admin"], true);

        let page = app.send(get_with_cookie("/admin", &cookie)).await;
        assert_eq!(page.status(), StatusCode::OK);
        assert_eq!(body_json(page).await["page"], "/admin");

        let login = app.send(get_with_cookie("/login", &cookie)).await;
        assertions::assert_redirect(&login, "/admin");
    }

    #[tokio::test]
    async fn test_login_offers_sign_in_once_admin_exists() {
        let app = TestApp::new();
        app.account("admin@example.com", Some(Role::Admin));

        let login = app.send(get("/login", None)).await;
        let body = body_json(login).await;
        assert_eq!(body["state"], "login");
        assert_eq!(body["form"]["kind"], "sign-in");

        let second = app
            .send(post_json(
                "/v1/auth/setup-admin",
                None,
                json!({ "email": "intruder@example.com", "password": PASSWORD }),
            ))
            .await;
        assertions::assert_error(second, StatusCode::FORBIDDEN, "BOOTSTRAP_CLOSED").await;
        assert_eq!(app.backend.calls(MockOperation::SignUp), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_setup_admin_creates_one_admin() {
        let app = TestApp::new();
        app.backend
            .set_latency(MockOperation::SignUp, Duration::from_millis(50));
        let setup = |email: &str| {
            post_json(
                "/v1/auth/setup-admin",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
        };

        let (first, second) = tokio::join!(
            app.send(setup("first@example.com")),
            app.send(setup("second@example.com")),
        );

        let mut statuses = [first.status(), second.status()];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::CREATED, StatusCode::FORBIDDEN]);
        assert_eq!(app.backend.calls(MockOperation::SignUp), 1);
        assert_eq!(app.backend.role_count(Role::Admin), 1);
    }

    #[tokio::test]
    async fn test_unreachable_directory_never_offers_setup() {
        let app = TestApp::new();
        app.backend.fail(
            MockOperation::AdminExists,
            BackendError::Request("connection refused".to_string()),
        );

        let body = body_json(app.send(get("/login", None)).await).await;
        assert_eq!(body["state"], "login");
    }
}

mod test_sign_in {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_cookie_opens_role_home() {
        let app = TestApp::new();
        app.account("coach@example.com", Some(Role::Coach));

        let response = app
            .send(post_json(
                "/v1/auth/sign-in",
                None,
                json!({ "email": "Coach@Example.com ", "password": PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(response.headers());
        assert!(cookie.starts_with("coachdesk_session="));
        assert_eq!(body_json(response).await["redirect_to"], "/dashboard");

        let page = app.send(get_with_cookie("/dashboard", &cookie)).await;
        assert_eq!(page.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_password_is_dismissible_error() {
        let app = TestApp::new();
        app.account("coach@example.com", Some(Role::Coach));

        let response = app
            .send(post_json(
                "/v1/auth/sign-in",
                None,
                json!({ "email": "coach@example.com", "password": "not-the-one" }),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
        assert_eq!(body["error"]["dismissible"], true);
    }

    #[tokio::test]
    async fn test_malformed_email_rejected_before_provider() {
        let app = TestApp::new();

        let response = app
            .send(post_json(
                "/v1/auth/sign-in",
                None,
                json!({ "email": "not-an-email", "password": PASSWORD }),
            ))
            .await;

        assertions::assert_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
        assert_eq!(app.backend.calls(MockOperation::SignIn), 0);
    }

    #[tokio::test]
    async fn test_session_endpoint_reports_flags() {
        let app = TestApp::new();
        let (id, token) = app.account("client@example.com", Some(Role::Client));

        let response = app.send(get("/v1/auth/session", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["user"]["id"], id.to_string());
        assert_eq!(body["user"]["role"], "client");
        assert_eq!(body["flags"]["is_client"], true);
        assert_eq!(body["flags"]["is_admin"], false);
        assert_eq!(body["redirect_to"], "/client");
    }
}

mod test_sign_out {
    use super::*;

    #[tokio::test]
    async fn test_sign_out_revokes_session() {
        let app = TestApp::new();
        let (_, token) = app.account("coach@example.com", Some(Role::Coach));

        let response = app
            .send(post_json("/v1/auth/sign-out", Some(&token), json!({})))
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(session_cookie(response.headers()).starts_with("coachdesk_session="));

        let page = app.send(get("/dashboard", Some(&token))).await;
        assertions::assert_redirect(&page, "/login");
    }

    #[tokio::test]
    async fn test_sign_out_clears_cookie_when_provider_fails() {
        let app = TestApp::new();
        let (_, token) = app.account("coach@example.com", Some(Role::Coach));
        app.backend.fail(
            MockOperation::SignOut,
            BackendError::Request("timeout".to_string()),
        );

        let response = app
            .send(post_json("/v1/auth/sign-out", Some(&token), json!({})))
            .await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cleared = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(cleared.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_externally_revoked_token_reads_as_signed_out() {
        let app = TestApp::new();
        let (id, token) = app.account("client@example.com", Some(Role::Client));
        app.backend.revoke_tokens_for(id);

        let response = app.send(get("/v1/auth/session", Some(&token))).await;
        assertions::assert_error(response, StatusCode::UNAUTHORIZED, "UNAUTHENTICATED").await;
    }
}
