//! Authentication errors

use std::future::Future;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coachdesk_backend::BackendError;
use serde_json::json;
use uuid::Uuid;

/// Authentication and onboarding error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailAlreadyRegistered,

    #[error("This invitation is invalid or has expired")]
    InvalidOrExpiredInvite,

    /// The account exists but role assignment or invitation acceptance did not
    /// complete. Needs manual intervention, never retried automatically.
    #[error("Account {user_id} was created but invitation setup did not complete: {reason}")]
    PartialAcceptanceFailure { user_id: Uuid, reason: String },

    #[error("Role lookup failed: {0}")]
    RoleLookupFailure(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("An administrator account already exists")]
    BootstrapClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            AuthError::InvalidOrExpiredInvite => "INVALID_OR_EXPIRED_INVITE",
            AuthError::PartialAcceptanceFailure { .. } => "PARTIAL_ACCEPTANCE_FAILURE",
            AuthError::RoleLookupFailure(_) => "ROLE_LOOKUP_FAILURE",
            AuthError::Network(_) => "NETWORK_ERROR",
            AuthError::Timeout(_) => "TIMEOUT",
            AuthError::Unauthenticated => "UNAUTHENTICATED",
            AuthError::Forbidden(_) => "FORBIDDEN",
            AuthError::BootstrapClosed => "BOOTSTRAP_CLOSED",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::EmailAlreadyRegistered => StatusCode::CONFLICT,
            AuthError::InvalidOrExpiredInvite => StatusCode::GONE,
            AuthError::PartialAcceptanceFailure { .. } | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::RoleLookupFailure(_) | AuthError::Network(_) => StatusCode::BAD_GATEWAY,
            AuthError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Forbidden(_) | AuthError::BootstrapClosed => StatusCode::FORBIDDEN,
        }
    }

    /// Whether the caller may dismiss the notice and retry the same form
    pub fn is_dismissible(&self) -> bool {
        !matches!(self, AuthError::PartialAcceptanceFailure { .. })
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidCredentials => AuthError::InvalidCredentials,
            BackendError::Unauthorized => AuthError::Unauthenticated,
            BackendError::Rejected(message) => AuthError::Validation(message),
            other => AuthError::Network(other.to_string()),
        }
    }
}

/// Run a backend call under `limit`, mapping elapsed time to `AuthError::Timeout`.
///
/// The inner backend result is handed back untouched so the caller can map
/// specific variants (conflicts, rejected credentials) itself.
pub async fn remote_call<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<Result<T, BackendError>, AuthError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => Ok(result),
        Err(_) => {
            tracing::warn!(operation, timeout_secs = limit.as_secs(), "Backend call timed out");
            Err(AuthError::Timeout(operation))
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Auth request failed");
        }

        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
            "dismissible": self.is_dismissible(),
        });
        if let AuthError::PartialAcceptanceFailure { user_id, .. } = &self {
            error["user_id"] = json!(user_id);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
