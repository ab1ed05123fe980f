//! Route-guard middleware for protected page trees.
//!
//! Resolves session and role fully before the inner handler runs. On allow,
//! the resolved `Principal` is stored in request extensions for `AuthUser`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::backend::AuthBackend;
use crate::extractors::access_token_from_headers;
use crate::guard::{AccessDecision, RouteRequirement};

/// Middleware state: which tree is guarded and by which roles
#[derive(Clone)]
pub struct GuardState {
    pub auth: AuthBackend,
    pub requirement: RouteRequirement,
}

impl GuardState {
    pub fn new(auth: AuthBackend, requirement: RouteRequirement) -> Self {
        Self { auth, requirement }
    }
}

pub async fn enforce_route(
    State(state): State<GuardState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = access_token_from_headers(request.headers(), &state.auth.config().session_cookie);
    let guard = state.auth.guard_for(state.auth.session(token));

    let principal = guard.resolve().await;
    match guard.decide(principal.as_ref(), &state.requirement) {
        AccessDecision::Allow => {
            if let Some(principal) = principal {
                request.extensions_mut().insert(principal);
            }
            next.run(request).await
        }
        AccessDecision::RedirectTo(to) => Redirect::to(&to).into_response(),
    }
}
