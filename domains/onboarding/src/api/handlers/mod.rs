//! HTTP handlers for the Onboarding domain

pub mod auth;
pub mod invitations;

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use coachdesk_auth::{AuthConfig, Principal, RoleFlags, SessionStore};
use serde::Serialize;

/// Response shape for every endpoint that establishes or reports a session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Principal,
    pub flags: RoleFlags,
    /// Where the client should navigate next
    pub redirect_to: String,
}

impl SessionResponse {
    pub fn new(principal: Principal, config: &AuthConfig) -> Self {
        let redirect_to = principal
            .role
            .map(|role| config.home_for(role).to_string())
            .unwrap_or_else(|| config.fallback_path.clone());
        Self {
            flags: principal.flags(),
            user: principal,
            redirect_to,
        }
    }
}

/// `Set-Cookie` headers carrying the store's access token, or clearing the
/// cookie when the store holds none
pub(crate) fn session_cookie_headers(session: &SessionStore, config: &AuthConfig) -> HeaderMap {
    let cookie = match session.access_token() {
        Some(token) => format!(
            "{}={}; Path=/; HttpOnly; Secure; SameSite=Lax",
            config.session_cookie, token
        ),
        None => format!(
            "{}=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=0",
            config.session_cookie
        ),
    };

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.insert(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Access token is not a valid cookie value"),
    }
    headers
}
