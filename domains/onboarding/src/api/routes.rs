//! Route definitions for Onboarding domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{auth, invitations};
use super::middleware::OnboardingState;

/// Public entry point: flow resolution for the login/registration form
fn login_routes() -> Router<OnboardingState> {
    Router::new().route("/login", get(auth::login_page))
}

/// Create session routes
fn auth_routes() -> Router<OnboardingState> {
    Router::new()
        .route("/v1/auth/sign-in", post(auth::sign_in))
        .route("/v1/auth/sign-out", post(auth::sign_out))
        .route("/v1/auth/session", get(auth::current_session))
        .route("/v1/auth/setup-admin", post(auth::setup_admin))
}

/// Create invitation routes
fn invitation_routes() -> Router<OnboardingState> {
    Router::new()
        .route(
            "/v1/invitations",
            get(invitations::list_invitations).post(invitations::create_invitation),
        )
        .route(
            "/v1/invitations/{token}",
            get(invitations::preview_invitation).delete(invitations::delete_invitation),
        )
        .route(
            "/v1/invitations/{token}/accept",
            post(invitations::accept_invitation),
        )
}

/// Create all Onboarding domain API routes
pub fn routes() -> Router<OnboardingState> {
    Router::new()
        .merge(login_routes())
        .merge(auth_routes())
        .merge(invitation_routes())
}
