//! Authentication configuration

use std::time::Duration;

use coachdesk_common::Role;

use crate::error::AuthError;

/// Cookie carrying the access token for browser sessions
pub const SESSION_COOKIE: &str = "coachdesk_session";

/// Authentication configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub login_path: String,
    /// Redirect target for authenticated identities without an allowed role
    pub fallback_path: String,
    pub admin_home: String,
    pub coach_home: String,
    pub client_home: String,
    /// Upper bound on every session check and role lookup
    pub lookup_timeout: Duration,
    pub session_cookie: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            fallback_path: "/login".to_string(),
            admin_home: "/admin".to_string(),
            coach_home: "/dashboard".to_string(),
            client_home: "/client".to_string(),
            lookup_timeout: Duration::from_secs(10),
            session_cookie: SESSION_COOKIE.to_string(),
        }
    }
}

impl AuthConfig {
    /// Create auth config from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let lookup_timeout = match std::env::var("AUTH_LOOKUP_TIMEOUT_SECS") {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(AuthError::Validation(format!(
                        "AUTH_LOOKUP_TIMEOUT_SECS must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            Err(_) => defaults.lookup_timeout,
        };

        let fallback_path =
            std::env::var("AUTH_FALLBACK_PATH").unwrap_or_else(|_| defaults.fallback_path.clone());
        if !fallback_path.starts_with('/') {
            return Err(AuthError::Validation(
                "AUTH_FALLBACK_PATH must be an absolute path".to_string(),
            ));
        }

        Ok(Self {
            fallback_path,
            lookup_timeout,
            ..defaults
        })
    }

    /// Landing path for a role
    pub fn home_for(&self, role: Role) -> &str {
        match role {
            Role::Admin => &self.admin_home,
            Role::Coach => &self.coach_home,
            Role::Client => &self.client_home,
        }
    }
}
