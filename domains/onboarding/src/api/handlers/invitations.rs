//! Invitation API handlers
//!
//! Implements:
//! - GET /v1/invitations/{token} - Prefill payload for an unconsumed invitation
//! - POST /v1/invitations/{token}/accept - Create the invitee's account
//! - GET /v1/invitations - Invitations visible to the caller (admin or coach)
//! - POST /v1/invitations - Invite a coach or client
//! - DELETE /v1/invitations/{id} - Withdraw an invitation

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use coachdesk_auth::{AuthError, AuthUser, CurrentSession, Principal};
use coachdesk_common::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{session_cookie_headers, SessionResponse};
use crate::api::middleware::OnboardingState;
use crate::domain::entities::{Invitation, InvitePrefill};
use crate::domain::state::InvitationState;

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    pub role: Role,
}

/// Invitation as shown to the inviter
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// Effective state, so a pending row past its expiry reads as expired
    pub status: InvitationState,
    pub expires_at: DateTime<Utc>,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Shareable link path carrying the token
    pub invite_path: String,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            invite_path: format!("/login?invite={}", invitation.token),
            status: invitation.state(),
            id: invitation.id,
            email: invitation.email,
            role: invitation.role,
            expires_at: invitation.expires_at,
            invited_by: invitation.invited_by,
            created_at: invitation.created_at,
        }
    }
}

fn require_inviter(principal: &Principal) -> Result<(), AuthError> {
    if principal.has_role(&[Role::Admin, Role::Coach]) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(
            "Only admins and coaches manage invitations".to_string(),
        ))
    }
}

/// GET /v1/invitations/{token}
pub async fn preview_invitation(
    State(state): State<OnboardingState>,
    Path(token): Path<String>,
) -> Result<Json<InvitePrefill>, AuthError> {
    let invitation = state.invitations.fetch_invitation(&token).await?;
    Ok(Json(invitation.prefill()))
}

/// POST /v1/invitations/{token}/accept
pub async fn accept_invitation(
    State(state): State<OnboardingState>,
    CurrentSession(session): CurrentSession,
    Path(token): Path<String>,
    Json(request): Json<AcceptInvitationRequest>,
) -> Result<Response, AuthError> {
    let invitation = state.invitations.fetch_invitation(&token).await?;
    let identity = state
        .invitations
        .accept_invitation(
            &token,
            &session,
            &request.password,
            request.full_name.as_deref(),
        )
        .await?;

    let config = state.auth.config();
    let principal = Principal {
        identity,
        role: Some(invitation.role),
    };
    let headers = session_cookie_headers(&session, config);
    Ok((
        StatusCode::CREATED,
        headers,
        Json(SessionResponse::new(principal, config)),
    )
        .into_response())
}

/// GET /v1/invitations
pub async fn list_invitations(
    State(state): State<OnboardingState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<InvitationResponse>>, AuthError> {
    require_inviter(&principal)?;

    let invitations = state.invitations.list_invitations(&principal).await?;
    Ok(Json(
        invitations
            .into_iter()
            .map(InvitationResponse::from)
            .collect(),
    ))
}

/// POST /v1/invitations
pub async fn create_invitation(
    State(state): State<OnboardingState>,
    AuthUser(principal): AuthUser,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>), AuthError> {
    require_inviter(&principal)?;
    request
        .validate()
        .map_err(|e| AuthError::Validation(format!("Validation failed: {}", e)))?;

    let invitation = state
        .invitations
        .create_invitation(&principal, &request.email, request.role)
        .await?;

    Ok((StatusCode::CREATED, Json(InvitationResponse::from(invitation))))
}

/// DELETE /v1/invitations/{id}
pub async fn delete_invitation(
    State(state): State<OnboardingState>,
    AuthUser(principal): AuthUser,
    Path(invitation_id): Path<Uuid>,
) -> Result<StatusCode, AuthError> {
    require_inviter(&principal)?;
    state
        .invitations
        .delete_invitation(&principal, invitation_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
