//! Session API handlers
//!
//! Implements:
//! - GET /login - Resolve which form the login route shows
//! - POST /v1/auth/sign-in - Credentialed sign-in
//! - POST /v1/auth/sign-out - Sign out and clear the session cookie
//! - GET /v1/auth/session - Current principal and role flags
//! - POST /v1/auth/setup-admin - First-run administrator creation

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use coachdesk_auth::{AuthError, AuthUser, CurrentSession, Principal};
use coachdesk_common::Role;
use serde::{Deserialize, Serialize};

use super::{session_cookie_headers, SessionResponse};
use crate::api::middleware::OnboardingState;
use crate::domain::bootstrap::bootstrap_admin;
use crate::domain::flow::{AuthForm, FlowState};

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub invite: Option<String>,
}

/// Response shape for `GET /login`
#[derive(Debug, Serialize)]
pub struct LoginPageResponse {
    pub state: FlowState,
    pub form: AuthForm,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetupAdminRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

/// GET /login - Resolve the auth flow for this entry.
///
/// A signed-in user arriving without an invite token is sent to their home.
pub async fn login_page(
    State(state): State<OnboardingState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<LoginQuery>,
) -> Response {
    let invite = query.invite.filter(|t| !t.trim().is_empty());

    if invite.is_none() && session.access_token().is_some() {
        let principal = state.auth.guard_for(session).resolve().await;
        if let Some(role) = principal.and_then(|p| p.role) {
            return Redirect::to(state.auth.config().home_for(role)).into_response();
        }
    }

    let flow = state.flow_controller().resolve(invite.as_deref()).await;
    Json(LoginPageResponse {
        state: flow.state(),
        form: flow.form(),
    })
    .into_response()
}

/// POST /v1/auth/sign-in
pub async fn sign_in(
    State(state): State<OnboardingState>,
    CurrentSession(session): CurrentSession,
    Json(request): Json<SignInRequest>,
) -> Result<Response, AuthError> {
    session.sign_in(&request.email, &request.password).await?;

    let guard = state.auth.guard_for(session.clone());
    let principal = guard.resolve().await.ok_or(AuthError::Unauthenticated)?;

    let headers = session_cookie_headers(&session, state.auth.config());
    let body = SessionResponse::new(principal, state.auth.config());
    Ok((headers, Json(body)).into_response())
}

/// POST /v1/auth/sign-out
///
/// The cookie is cleared even when the provider call fails.
pub async fn sign_out(
    State(state): State<OnboardingState>,
    CurrentSession(session): CurrentSession,
) -> Response {
    if let Err(e) = session.sign_out().await {
        tracing::warn!(error = %e, "Provider sign-out failed; cookie cleared anyway");
    }

    let headers = session_cookie_headers(&session, state.auth.config());
    (StatusCode::NO_CONTENT, headers).into_response()
}

/// GET /v1/auth/session
pub async fn current_session(
    State(state): State<OnboardingState>,
    AuthUser(principal): AuthUser,
) -> Json<SessionResponse> {
    Json(SessionResponse::new(principal, state.auth.config()))
}

/// POST /v1/auth/setup-admin
pub async fn setup_admin(
    State(state): State<OnboardingState>,
    CurrentSession(session): CurrentSession,
    Json(request): Json<SetupAdminRequest>,
) -> Result<Response, AuthError> {
    let config = state.auth.config();
    let _setup = state.setup_gate.lock().await;
    let identity = bootstrap_admin(
        state.auth.directory().as_ref(),
        &session,
        &request.email,
        &request.password,
        request.full_name.as_deref(),
        config.lookup_timeout,
    )
    .await?;

    let principal = Principal {
        identity,
        role: Some(Role::Admin),
    };
    let headers = session_cookie_headers(&session, config);
    Ok((
        StatusCode::CREATED,
        headers,
        Json(SessionResponse::new(principal, config)),
    )
        .into_response())
}
