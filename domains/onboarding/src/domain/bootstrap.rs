//! First-run administrator provisioning

use std::time::Duration;

use coachdesk_auth::{remote_call, AuthError, Credentials, Identity, SessionStore};
use coachdesk_backend::{BackendError, Directory};
use coachdesk_common::Role;
use serde_json::json;

/// Create the first administrator account.
///
/// The admin check up front only spares a sign-up when setup is plainly
/// closed. The grant itself goes through `Directory::claim_first_admin`, so of
/// two concurrent bootstraps exactly one ends up holding the admin role.
pub async fn bootstrap_admin(
    directory: &dyn Directory,
    session: &SessionStore,
    email: &str,
    password: &str,
    full_name: Option<&str>,
    lookup_timeout: Duration,
) -> Result<Identity, AuthError> {
    let credentials = Credentials::validated(email, password)?;

    let admin_exists = remote_call(lookup_timeout, "admin check", directory.admin_exists())
        .await?
        .map_err(|e| {
            tracing::warn!(error = %e, "Admin check failed; refusing bootstrap");
            AuthError::from(e)
        })?;
    if admin_exists {
        tracing::warn!("Bootstrap attempted while an administrator exists");
        return Err(AuthError::BootstrapClosed);
    }

    let metadata = match full_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => json!({ "full_name": name }),
        None => json!({}),
    };
    let identity = session
        .sign_up(&credentials.email, &credentials.password, metadata)
        .await?;

    let claimed = remote_call(
        lookup_timeout,
        "admin claim",
        directory.claim_first_admin(identity.id),
    )
    .await;
    let failure = match claimed {
        Ok(Ok(())) => None,
        Ok(Err(BackendError::Conflict(_))) => {
            tracing::error!(user_id = %identity.id, "Lost the first-admin claim; account left without a role");
            session.invalidate();
            return Err(AuthError::BootstrapClosed);
        }
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => Some(e.to_string()),
    };
    if let Some(reason) = failure {
        tracing::error!(user_id = %identity.id, error = %reason, "Admin account created but role could not be assigned");
        return Err(AuthError::PartialAcceptanceFailure {
            user_id: identity.id,
            reason: format!("admin role could not be assigned: {}", reason),
        });
    }

    tracing::info!(user_id = %identity.id, "Administrator provisioned");
    Ok(identity)
}
