//! Onboarding domain entities

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use coachdesk_auth::AuthError;
use coachdesk_backend::{InvitationRecord, InvitationStatus, NewInvitation};
use coachdesk_common::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::state::{
    InvitationEvent, InvitationGuardContext, InvitationState, InvitationStateMachine,
};

/// Invitation entity - single-use provisioning link for a new account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub token: String,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Values the invite form is pre-filled with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitePrefill {
    pub email: String,
    pub role: Role,
}

/// 32 random bytes, URL-safe base64 encoded (43 chars)
pub fn generate_invitation_token() -> Result<String, AuthError> {
    let mut token_bytes = [0u8; 32];
    getrandom::getrandom(&mut token_bytes)
        .map_err(|e| AuthError::Internal(format!("Failed to generate random bytes: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(token_bytes))
}

impl Invitation {
    /// Build the insert payload for a new invitation
    pub fn issue(
        invited_by: Uuid,
        email: &str,
        role: Role,
        ttl: chrono::Duration,
    ) -> Result<NewInvitation, AuthError> {
        if role == Role::Admin {
            return Err(AuthError::Validation(
                "Admin accounts cannot be created by invitation".to_string(),
            ));
        }

        Ok(NewInvitation {
            token: generate_invitation_token()?,
            email: email.trim().to_lowercase(),
            role,
            expires_at: Utc::now() + ttl,
            invited_by,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Effective state at `now`
    pub fn state_at(&self, now: DateTime<Utc>) -> InvitationState {
        match InvitationState::from(self.status) {
            InvitationState::Pending if self.is_expired_at(now) => InvitationState::Expired,
            state => state,
        }
    }

    /// Get current invitation state
    pub fn state(&self) -> InvitationState {
        self.state_at(Utc::now())
    }

    /// Check if the invitation can still be accepted at `now`
    pub fn can_accept_at(&self, now: DateTime<Utc>) -> bool {
        let context = InvitationGuardContext {
            is_expired: self.is_expired_at(now),
        };
        InvitationStateMachine::can_transition(
            self.state_at(now),
            &InvitationEvent::Accept,
            Some(&context),
        )
    }

    pub fn prefill(&self) -> InvitePrefill {
        InvitePrefill {
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl From<InvitationRecord> for Invitation {
    fn from(record: InvitationRecord) -> Self {
        Self {
            id: record.id,
            token: record.token,
            email: record.email,
            role: record.role,
            status: record.status,
            expires_at: record.expires_at,
            invited_by: record.invited_by,
            created_at: record.created_at,
        }
    }
}
