//! Axum extractors for authentication
//!
//! Generic over any state `S` where `AuthBackend: FromRef<S>`.
//! This is axum's idiomatic nested-state pattern.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};

use crate::backend::AuthBackend;
use crate::error::AuthError;
use crate::session::SessionStore;
use crate::types::Principal;

/// Access token from `Authorization: Bearer ...`, else from the session cookie
pub fn access_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Per-request session store, possibly signed out. Never rejects.
pub struct CurrentSession(pub Arc<SessionStore>);

impl<S> FromRequestParts<S> for CurrentSession
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let backend = AuthBackend::from_ref(state);
        let token = access_token_from_headers(&parts.headers, &backend.config().session_cookie);
        Ok(CurrentSession(backend.session(token)))
    }
}

/// Signed-in principal with its resolved role (which may be `None`)
#[derive(Debug)]
pub struct AuthUser(pub Principal);

impl<S> FromRequestParts<S> for AuthUser
where
    AuthBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        // Already resolved by `enforce_route` on guarded trees
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(AuthUser(principal.clone()));
        }

        let backend = AuthBackend::from_ref(state);
        let token = access_token_from_headers(&parts.headers, &backend.config().session_cookie)
            .ok_or(AuthError::Unauthenticated)?;

        let guard = backend.guard_for(backend.session(Some(token)));
        let principal = guard.resolve().await.ok_or(AuthError::Unauthenticated)?;

        Ok(AuthUser(principal))
    }
}
