//! Coachdesk application composition root
//!
//! Composes the onboarding and messaging routers with the role-guarded page
//! trees into a single application.

use axum::{
    middleware,
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use coachdesk_auth::{
    enforce_route, AuthBackend, AuthConfig, AuthUser, GuardState, Principal, RoleFlags,
    RouteRequirement,
};
use coachdesk_backend::{BackendConfig, BackendFactory, BackendServices};
use coachdesk_common::Role;
use coachdesk_messaging::{AttachmentConfig, AttachmentUploader, MessagingState};
use coachdesk_onboarding::{InvitationConfig, InvitationValidator, OnboardingState};
use serde::Serialize;

/// Component settings gathered from the environment
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    pub auth: AuthConfig,
    pub invitations: InvitationConfig,
    pub attachments: AttachmentConfig,
}

impl AppSettings {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(Self {
            auth: AuthConfig::from_env()?,
            invitations: InvitationConfig::from_env()?,
            attachments: AttachmentConfig::from_env(),
        })
    }
}

/// Build backend services from `BACKEND_PROVIDER` and friends
pub fn backend_from_env() -> Result<BackendServices, anyhow::Error> {
    let config = BackendConfig::from_env()?;
    Ok(BackendFactory::create(config)?)
}

/// Create the main application router with all routes
pub fn create_app(backend: BackendServices, settings: AppSettings) -> Router {
    let lookup_timeout = settings.auth.lookup_timeout;
    let auth = AuthBackend::new(
        backend.identity.clone(),
        backend.directory.clone(),
        settings.auth,
    );

    let onboarding_state = OnboardingState::new(
        auth.clone(),
        InvitationValidator::new(
            backend.invitations.clone(),
            backend.directory.clone(),
            settings.invitations,
            lookup_timeout,
        ),
    );
    let messaging_state = MessagingState {
        auth: auth.clone(),
        attachments: AttachmentUploader::new(
            backend.storage.clone(),
            settings.attachments,
            lookup_timeout,
        ),
    };

    let login_path = auth.config().login_path.clone();
    Router::new()
        .route("/health", get(health_check))
        .merge(protected_pages(&auth))
        .merge(coachdesk_onboarding::routes().with_state(onboarding_state))
        .merge(coachdesk_messaging::routes().with_state(messaging_state))
        .fallback(move || unknown_route(login_path.clone()))
}

/// Role-guarded page trees. Each tree resolves session and role before its
/// handler runs.
fn protected_pages(auth: &AuthBackend) -> Router {
    let tree = |root: &'static str, allowed: &[Role]| {
        let guard = GuardState::new(auth.clone(), RouteRequirement::new(root, allowed));
        Router::new()
            .route(root, get(move |user: AuthUser| page(root, user)))
            .route(
                &format!("{}/{{*rest}}", root),
                get(move |user: AuthUser| page(root, user)),
            )
            .route_layer(middleware::from_fn_with_state(guard, enforce_route))
            .with_state(auth.clone())
    };

    Router::new()
        .merge(tree("/dashboard", &[Role::Coach, Role::Admin]))
        .merge(tree("/admin", &[Role::Admin]))
        .merge(tree("/client", &[Role::Client]))
}

#[derive(Debug, Serialize)]
struct PageResponse {
    page: &'static str,
    user: Principal,
    flags: RoleFlags,
}

async fn page(page: &'static str, AuthUser(principal): AuthUser) -> Json<PageResponse> {
    let flags = principal.flags();
    Json(PageResponse {
        page,
        user: principal,
        flags,
    })
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Anything unmatched lands on the public login route
async fn unknown_route(login_path: String) -> impl IntoResponse {
    Redirect::to(&login_path)
}
