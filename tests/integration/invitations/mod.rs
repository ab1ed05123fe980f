//! Invitation workflow integration tests
//!
//! Admin invites a coach, coach invites a client, both accept through the
//! invite link and land on their role's home.

use axum::http::{Method, StatusCode};
use coachdesk_backend::mock::MockOperation;
use coachdesk_backend::{BackendError, InvitationStatus};
use coachdesk_common::Role;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::{
    assertions, body_json, get, get_with_cookie, post_json, request, session_cookie, TestApp,
    PASSWORD,
};

/// Token from an `invite_path` of the form `/login?invite=TOKEN`
fn token_from(body: &Value) -> String {
    body["invite_path"]
        .as_str()
        .and_then(|p| p.strip_prefix("/login?invite="))
        .unwrap_or_default()
        .to_string()
}

mod test_workflow {
    use super::*;

    #[tokio::test]
    async fn test_admin_to_coach_to_client() {
        let app = TestApp::new();
        let (_, admin_token) = app.account("admin@example.com", Some(Role::Admin));

        // Admin invites a coach
        let created = app
            .send(post_json(
                "/v1/invitations",
                Some(&admin_token),
                json!({ "email": "Coach@Example.com", "role": "coach" }),
            ))
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let invite = body_json(created).await;
        assert_eq!(invite["email"], "coach@example.com");
        assert_eq!(invite["status"], "pending");
        let coach_invite = token_from(&invite);
        assert_eq!(coach_invite.len(), 43);

        // The invite link shows the accept form with a fixed email
        let login = app
            .send(get(&format!("/login?invite={}", coach_invite), None))
            .await;
        let page = body_json(login).await;
        assert_eq!(page["state"], "invite");
        assert_eq!(page["form"]["kind"], "accept-invite");
        assert_eq!(page["form"]["email"], "coach@example.com");
        assert_eq!(page["form"]["email_disabled"], true);
        assert_eq!(page["form"]["role"], "coach");

        // Coach accepts and lands on the dashboard
        let accepted = app
            .send(post_json(
                &format!("/v1/invitations/{}/accept", coach_invite),
                None,
                json!({ "password": PASSWORD, "full_name": "Casey Coach" }),
            ))
            .await;
        assert_eq!(accepted.status(), StatusCode::CREATED);
        let coach_cookie = session_cookie(accepted.headers());
        let body = body_json(accepted).await;
        assert_eq!(body["redirect_to"], "/dashboard");
        assert_eq!(body["user"]["role"], "coach");

        let dashboard = app.send(get_with_cookie("/dashboard", &coach_cookie)).await;
        assert_eq!(dashboard.status(), StatusCode::OK);

        // Coach signs in again later and invites a client
        let signed_in = app
            .send(post_json(
                "/v1/auth/sign-in",
                None,
                json!({ "email": "coach@example.com", "password": PASSWORD }),
            ))
            .await;
        assert_eq!(signed_in.status(), StatusCode::OK);
        let coach_token = session_cookie(signed_in.headers())
            .trim_start_matches("coachdesk_session=")
            .to_string();

        let created = app
            .send(post_json(
                "/v1/invitations",
                Some(&coach_token),
                json!({ "email": "client@example.com", "role": "client" }),
            ))
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let client_invite = token_from(&body_json(created).await);

        let accepted = app
            .send(post_json(
                &format!("/v1/invitations/{}/accept", client_invite),
                None,
                json!({ "password": PASSWORD }),
            ))
            .await;
        assert_eq!(accepted.status(), StatusCode::CREATED);
        let client_cookie = session_cookie(accepted.headers());
        assert_eq!(body_json(accepted).await["redirect_to"], "/client");

        let client_home = app.send(get_with_cookie("/client", &client_cookie)).await;
        assert_eq!(client_home.status(), StatusCode::OK);
        let dashboard = app.send(get_with_cookie("/dashboard", &client_cookie)).await;
        assertions::assert_redirect(&dashboard, "/client");
    }

    #[tokio::test]
    async fn test_invitation_is_single_use() {
        let app = TestApp::new();
        let record = app.pending_invitation("client@example.com", Role::Client, Uuid::new_v4());
        let accept = || {
            post_json(
                &format!("/v1/invitations/{}/accept", record.token),
                None,
                json!({ "password": PASSWORD }),
            )
        };

        assert_eq!(app.send(accept()).await.status(), StatusCode::CREATED);
        assert_eq!(
            app.backend.invitation(&record.token).map(|i| i.status),
            Some(InvitationStatus::Accepted)
        );

        let again = app.send(accept()).await;
        assertions::assert_error(again, StatusCode::GONE, "INVALID_OR_EXPIRED_INVITE").await;
    }

    #[tokio::test]
    async fn test_registered_email_reports_conflict() {
        let app = TestApp::new();
        app.account("client@example.com", Some(Role::Client));
        let record = app.pending_invitation("client@example.com", Role::Client, Uuid::new_v4());

        let response = app
            .send(post_json(
                &format!("/v1/invitations/{}/accept", record.token),
                None,
                json!({ "password": PASSWORD }),
            ))
            .await;

        assertions::assert_error(response, StatusCode::CONFLICT, "EMAIL_ALREADY_REGISTERED").await;
    }

    #[tokio::test]
    async fn test_role_assignment_failure_is_not_dismissible() {
        let app = TestApp::new();
        let record = app.pending_invitation("client@example.com", Role::Client, Uuid::new_v4());
        app.backend.fail(
            MockOperation::AssignRole,
            BackendError::Request("connection reset".to_string()),
        );

        let response = app
            .send(post_json(
                &format!("/v1/invitations/{}/accept", record.token),
                None,
                json!({ "password": PASSWORD }),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "PARTIAL_ACCEPTANCE_FAILURE");
        assert_eq!(body["error"]["dismissible"], false);
        assert!(body["error"]["user_id"].is_string());
    }
}

mod test_invite_links {
    use super::*;

    #[tokio::test]
    async fn test_expired_invite_falls_back_to_sign_in() {
        let app = TestApp::new();
        app.account("admin@example.com", Some(Role::Admin));
        let record = app.invitation(
            "late@example.com",
            Role::Client,
            Uuid::new_v4(),
            InvitationStatus::Pending,
            -1,
        );

        let page = body_json(
            app.send(get(&format!("/login?invite={}", record.token), None))
                .await,
        )
        .await;

        assert_eq!(page["state"], "login");
        assert_eq!(page["form"]["kind"], "sign-in");
        assert!(page["form"]["notice"].is_string());
    }

    #[tokio::test]
    async fn test_bogus_invite_without_admin_never_offers_setup() {
        let app = TestApp::new();

        let page = body_json(app.send(get("/login?invite=BOGUS", None)).await).await;

        assert_eq!(page["state"], "login");
        assert!(page["form"]["notice"].is_string());
    }

    #[tokio::test]
    async fn test_invite_link_shown_even_when_signed_in() {
        let app = TestApp::new();
        let (_, token) = app.account("admin@example.com", Some(Role::Admin));
        let record = app.pending_invitation("client@example.com", Role::Client, Uuid::new_v4());

        let response = app
            .send(get(&format!("/login?invite={}", record.token), Some(&token)))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["state"], "invite");
    }
}

mod test_management {
    use super::*;

    #[tokio::test]
    async fn test_coach_cannot_invite_coach() {
        let app = TestApp::new();
        let (_, token) = app.account("coach@example.com", Some(Role::Coach));

        let response = app
            .send(post_json(
                "/v1/invitations",
                Some(&token),
                json!({ "email": "other@example.com", "role": "coach" }),
            ))
            .await;

        assertions::assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
        assert_eq!(app.backend.calls(MockOperation::CreateInvitation), 0);
    }

    #[tokio::test]
    async fn test_nobody_invites_an_admin() {
        let app = TestApp::new();
        let (_, token) = app.account("admin@example.com", Some(Role::Admin));

        let response = app
            .send(post_json(
                "/v1/invitations",
                Some(&token),
                json!({ "email": "second@example.com", "role": "admin" }),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_coach_sees_only_own_invitations() {
        let app = TestApp::new();
        let (coach_id, coach_token) = app.account("coach@example.com", Some(Role::Coach));
        let (_, admin_token) = app.account("admin@example.com", Some(Role::Admin));
        app.pending_invitation("mine@example.com", Role::Client, coach_id);
        app.pending_invitation("theirs@example.com", Role::Client, Uuid::new_v4());

        let coach_view = body_json(app.send(get("/v1/invitations", Some(&coach_token))).await).await;
        let emails: Vec<&str> = coach_view
            .as_array()
            .map(|rows| rows.iter().filter_map(|r| r["email"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(emails, vec!["mine@example.com"]);

        let admin_view = body_json(app.send(get("/v1/invitations", Some(&admin_token))).await).await;
        assert_eq!(admin_view.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_coach_cannot_withdraw_others_invitation() {
        let app = TestApp::new();
        let (_, coach_token) = app.account("coach@example.com", Some(Role::Coach));
        let record = app.pending_invitation("theirs@example.com", Role::Client, Uuid::new_v4());

        let response = app
            .send(request(
                Method::DELETE,
                &format!("/v1/invitations/{}", record.id),
                Some(&coach_token),
                None,
            ))
            .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(app.backend.invitation(&record.token).is_some());
    }

    #[tokio::test]
    async fn test_admin_withdraws_invitation() {
        let app = TestApp::new();
        let (_, admin_token) = app.account("admin@example.com", Some(Role::Admin));
        let record = app.pending_invitation("client@example.com", Role::Client, Uuid::new_v4());

        let response = app
            .send(request(
                Method::DELETE,
                &format!("/v1/invitations/{}", record.id),
                Some(&admin_token),
                None,
            ))
            .await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(app.backend.invitation(&record.token).is_none());

        let link = body_json(
            app.send(get(&format!("/login?invite={}", record.token), None))
                .await,
        )
        .await;
        assert_eq!(link["state"], "login");
    }
}
