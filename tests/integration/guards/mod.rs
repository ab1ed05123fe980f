//! Guarded page tree integration tests
//!
//! - /dashboard - coach and admin
//! - /admin - admin only
//! - /client - client only
//! - anything unmatched redirects to /login

use std::time::Duration;

use axum::http::StatusCode;
use coachdesk_app::AppSettings;
use coachdesk_auth::AuthConfig;
use coachdesk_backend::mock::MockOperation;
use coachdesk_backend::BackendError;
use coachdesk_common::Role;

use crate::common::{assertions, body_json, get, get_with_cookie, TestApp};

mod test_role_homes {
    use super::*;

    #[tokio::test]
    async fn test_each_role_reaches_its_tree() {
        let app = TestApp::new();
        let cases = [
            ("admin@example.com", Role::Admin, "/admin"),
            ("admin2@example.com", Role::Admin, "/dashboard"),
            ("coach@example.com", Role::Coach, "/dashboard"),
            ("client@example.com", Role::Client, "/client"),
        ];

        for (email, role, path) in cases {
            let (_, token) = app.account(email, Some(role));
            let response = app.send(get(path, Some(&token))).await;
            assert_eq!(response.status(), StatusCode::OK, "{} on {}", role, path);
            assert_eq!(body_json(response).await["page"], path);
        }
    }

    #[tokio::test]
    async fn test_wrong_role_goes_to_own_home() {
        let app = TestApp::new();
        let (_, coach) = app.account("coach@example.com", Some(Role::Coach));
        let (_, client) = app.account("client@example.com", Some(Role::Client));
        let (_, admin) = app.account("admin@example.com", Some(Role::Admin));

        assertions::assert_redirect(&app.send(get("/admin", Some(&coach))).await, "/dashboard");
        assertions::assert_redirect(&app.send(get("/client", Some(&coach))).await, "/dashboard");
        assertions::assert_redirect(&app.send(get("/admin", Some(&client))).await, "/client");
        assertions::assert_redirect(&app.send(get("/dashboard", Some(&client))).await, "/client");
        assertions::assert_redirect(&app.send(get("/client", Some(&admin))).await, "/admin");
    }

    #[tokio::test]
    async fn test_nested_paths_share_the_tree_rule() {
        let app = TestApp::new();
        let (_, coach) = app.account("coach@example.com", Some(Role::Coach));

        let allowed = app.send(get("/dashboard/clients/42", Some(&coach))).await;
        assert_eq!(allowed.status(), StatusCode::OK);

        let denied = app.send(get("/admin/settings", Some(&coach))).await;
        assertions::assert_redirect(&denied, "/dashboard");
    }

    #[tokio::test]
    async fn test_page_exposes_principal() {
        let app = TestApp::new();
        let (id, token) = app.account("coach@example.com", Some(Role::Coach));

        let body = body_json(app.send(get("/dashboard", Some(&token))).await).await;

        assert_eq!(body["user"]["id"], id.to_string());
        assert_eq!(body["user"]["email"], "coach@example.com");
        assert_eq!(body["flags"]["is_coach"], true);
        assert_eq!(body["flags"]["is_admin"], false);
    }
}

mod test_fail_closed {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_goes_to_login() {
        let app = TestApp::new();
        for path in ["/dashboard", "/admin", "/client"] {
            assertions::assert_redirect(&app.send(get(path, None)).await, "/login");
        }
    }

    #[tokio::test]
    async fn test_unknown_cookie_goes_to_login() {
        let app = TestApp::new();
        let response = app
            .send(get_with_cookie("/dashboard", "coachdesk_session=mock-at-forged"))
            .await;
        assertions::assert_redirect(&response, "/login");
    }

    #[tokio::test]
    async fn test_identity_without_role_goes_to_fallback() {
        let settings = AppSettings {
            auth: AuthConfig {
                fallback_path: "/no-access".to_string(),
                ..AuthConfig::default()
            },
            ..AppSettings::default()
        };
        let app = TestApp::with_settings(settings);
        let (_, token) = app.account("nobody@example.com", None);

        for path in ["/dashboard", "/admin", "/client"] {
            assertions::assert_redirect(&app.send(get(path, Some(&token))).await, "/no-access");
        }
    }

    #[tokio::test]
    async fn test_role_lookup_failure_denies_access() {
        let app = TestApp::new();
        let (_, token) = app.account("admin@example.com", Some(Role::Admin));
        app.backend.fail(
            MockOperation::FetchRole,
            BackendError::Response {
                status: 503,
                message: "unavailable".to_string(),
            },
        );

        let response = app.send(get("/admin", Some(&token))).await;

        assertions::assert_redirect(&response, "/login");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_session_check_times_out_to_login() {
        let settings = AppSettings {
            auth: AuthConfig {
                lookup_timeout: Duration::from_secs(2),
                ..AuthConfig::default()
            },
            ..AppSettings::default()
        };
        let app = TestApp::with_settings(settings);
        let (_, token) = app.account("coach@example.com", Some(Role::Coach));
        app.backend
            .set_latency(MockOperation::CurrentUser, Duration::from_secs(60));

        let response = app.send(get("/dashboard", Some(&token))).await;

        assertions::assert_redirect(&response, "/login");
    }

    #[tokio::test]
    async fn test_unknown_routes_redirect_to_login() {
        let app = TestApp::new();
        for path in ["/", "/settings", "/v1/unknown"] {
            assertions::assert_redirect(&app.send(get(path, None)).await, "/login");
        }
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new();
        let response = app.send(get("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
