//! Invitation validator
//!
//! Fetch, accept, and manage invitation records. Acceptance creates the
//! account, consumes the invitation, and assigns the invited role; callers
//! see that as one operation that either succeeds or reports exactly which
//! part did not.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use coachdesk_auth::{
    remote_call, validate_email_address, validate_password, AuthError, Identity, Principal,
    SessionStore,
};
use coachdesk_backend::{BackendError, Directory, InvitationStore};
use coachdesk_common::Role;
use serde_json::json;
use uuid::Uuid;

use crate::domain::entities::Invitation;

/// Invitation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct InvitationConfig {
    /// Lifetime of a new invitation
    pub ttl: chrono::Duration,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::days(7),
        }
    }
}

impl InvitationConfig {
    /// Create invitation config from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        dotenvy::dotenv().ok();

        match std::env::var("INVITATION_TTL_DAYS") {
            Ok(raw) => match raw.parse::<i64>() {
                Ok(days) if days > 0 => Ok(Self {
                    ttl: chrono::Duration::days(days),
                }),
                _ => Err(AuthError::Validation(format!(
                    "INVITATION_TTL_DAYS must be a positive integer, got '{}'",
                    raw
                ))),
            },
            Err(_) => Ok(Self::default()),
        }
    }
}

#[derive(Clone)]
pub struct InvitationValidator {
    store: Arc<dyn InvitationStore>,
    directory: Arc<dyn Directory>,
    config: InvitationConfig,
    lookup_timeout: Duration,
}

impl InvitationValidator {
    pub fn new(
        store: Arc<dyn InvitationStore>,
        directory: Arc<dyn Directory>,
        config: InvitationConfig,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            store,
            directory,
            config,
            lookup_timeout,
        }
    }

    /// Fetch an invitation that can still be accepted.
    ///
    /// Absent, expired (`now >= expires_at`), and already-consumed records are
    /// all reported as `InvalidOrExpiredInvite`.
    pub async fn fetch_invitation(&self, token: &str) -> Result<Invitation, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidOrExpiredInvite);
        }

        let record = remote_call(
            self.lookup_timeout,
            "invitation fetch",
            self.store.find_by_token(token),
        )
        .await?
        .map_err(|e| {
            tracing::warn!(error = %e, "Invitation fetch failed");
            AuthError::from(e)
        })?;

        let Some(invitation) = record.map(Invitation::from) else {
            tracing::debug!("Invitation token not found");
            return Err(AuthError::InvalidOrExpiredInvite);
        };

        let now = Utc::now();
        if !invitation.can_accept_at(now) {
            tracing::debug!(invitation_id = %invitation.id, state = %invitation.state_at(now), "Invitation no longer usable");
            return Err(AuthError::InvalidOrExpiredInvite);
        }

        Ok(invitation)
    }

    /// Create the invitee's account and consume the invitation.
    ///
    /// The account is created with the invitation's email, never a
    /// caller-supplied one. Once the account exists, any failure is reported
    /// as `PartialAcceptanceFailure` so the caller does not retry sign-up.
    pub async fn accept_invitation(
        &self,
        token: &str,
        session: &SessionStore,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        validate_password(password)?;

        let invitation = self.fetch_invitation(token).await?;

        let metadata = match full_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => json!({ "full_name": name }),
            None => json!({}),
        };
        let identity = session
            .sign_up(&invitation.email, password, metadata)
            .await?;

        let consumed = remote_call(
            self.lookup_timeout,
            "invitation accept",
            self.store.accept(&invitation.token, identity.id),
        )
        .await;
        if let Err(reason) = flatten(consumed) {
            return Err(partial_failure(identity.id, "invitation could not be consumed", reason));
        }

        let assigned = remote_call(
            self.lookup_timeout,
            "role assignment",
            self.directory.assign_role(identity.id, invitation.role),
        )
        .await;
        if let Err(reason) = flatten(assigned) {
            return Err(partial_failure(identity.id, "role could not be assigned", reason));
        }

        tracing::info!(
            user_id = %identity.id,
            invitation_id = %invitation.id,
            role = %invitation.role,
            "Invitation accepted"
        );
        Ok(identity)
    }

    /// Create an invitation on behalf of `inviter`.
    ///
    /// Admins invite coaches and clients; coaches invite clients.
    pub async fn create_invitation(
        &self,
        inviter: &Principal,
        email: &str,
        role: Role,
    ) -> Result<Invitation, AuthError> {
        let allowed = inviter.role.is_some_and(|r| r.can_invite(role));
        if !allowed {
            tracing::warn!(user_id = %inviter.identity.id, target_role = %role, "Invitation not permitted");
            return Err(AuthError::Forbidden(format!(
                "Your role cannot invite a {}",
                role
            )));
        }
        validate_email_address(email)?;

        let new = Invitation::issue(inviter.identity.id, email, role, self.config.ttl)?;
        let record = remote_call(
            self.lookup_timeout,
            "invitation create",
            self.store.create(new),
        )
        .await?
        .map_err(|e| {
            tracing::warn!(error = %e, "Invitation create failed");
            AuthError::from(e)
        })?;

        tracing::info!(
            user_id = %inviter.identity.id,
            invitation_id = %record.id,
            role = %record.role,
            "Invitation created"
        );
        Ok(Invitation::from(record))
    }

    /// Admins see every invitation, coaches see the ones they sent
    pub async fn list_invitations(&self, viewer: &Principal) -> Result<Vec<Invitation>, AuthError> {
        let records = remote_call(self.lookup_timeout, "invitation list", self.store.list())
            .await?
            .map_err(AuthError::from)?;

        let is_admin = viewer.role == Some(Role::Admin);
        Ok(records
            .into_iter()
            .map(Invitation::from)
            .filter(|i| is_admin || i.invited_by == viewer.identity.id)
            .collect())
    }

    /// Delete an invitation. Coaches may only delete their own.
    pub async fn delete_invitation(
        &self,
        actor: &Principal,
        invitation_id: Uuid,
    ) -> Result<(), AuthError> {
        let visible = self.list_invitations(actor).await?;
        if !visible.iter().any(|i| i.id == invitation_id) {
            return Err(AuthError::Forbidden(
                "Invitation not found or not yours to delete".to_string(),
            ));
        }

        remote_call(
            self.lookup_timeout,
            "invitation delete",
            self.store.delete(invitation_id),
        )
        .await?
        .map_err(AuthError::from)?;

        tracing::info!(user_id = %actor.identity.id, invitation_id = %invitation_id, "Invitation deleted");
        Ok(())
    }
}

fn flatten<T>(result: Result<Result<T, BackendError>, AuthError>) -> Result<T, String> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

fn partial_failure(user_id: Uuid, what: &str, cause: String) -> AuthError {
    tracing::error!(user_id = %user_id, error = %cause, "Account created but {}", what);
    AuthError::PartialAcceptanceFailure {
        user_id,
        reason: format!("{}: {}", what, cause),
    }
}
