//! Auth flow controller
//!
//! Picks which form the public login route shows: sign-in, invitation
//! acceptance, or first-run admin setup. Evaluated once per entry; later
//! calls return the first outcome.

use std::sync::Arc;
use std::time::Duration;

use coachdesk_auth::remote_call;
use coachdesk_backend::Directory;
use coachdesk_common::Role;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::domain::entities::InvitePrefill;
use crate::domain::invitations::InvitationValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowState {
    Resolving,
    Login,
    Invite,
    SetupAdmin,
}

/// Resolved flow outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum AuthFlow {
    Login { notice: Option<String> },
    Invite { token: String, prefill: InvitePrefill },
    SetupAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormKind {
    SignIn,
    AcceptInvite,
    SetupAdmin,
}

/// What the presentation layer renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthForm {
    pub kind: FormKind,
    pub email: Option<String>,
    /// Invitation email is fixed; the field is shown but not editable
    pub email_disabled: bool,
    pub role: Option<Role>,
    pub invite_token: Option<String>,
    pub notice: Option<String>,
}

const INVALID_INVITE_NOTICE: &str =
    "This invitation link is invalid or has expired. Sign in, or ask for a new invitation.";

impl AuthFlow {
    pub fn state(&self) -> FlowState {
        match self {
            AuthFlow::Login { .. } => FlowState::Login,
            AuthFlow::Invite { .. } => FlowState::Invite,
            AuthFlow::SetupAdmin => FlowState::SetupAdmin,
        }
    }

    pub fn form(&self) -> AuthForm {
        match self {
            AuthFlow::Login { notice } => AuthForm {
                kind: FormKind::SignIn,
                email: None,
                email_disabled: false,
                role: None,
                invite_token: None,
                notice: notice.clone(),
            },
            AuthFlow::Invite { token, prefill } => AuthForm {
                kind: FormKind::AcceptInvite,
                email: Some(prefill.email.clone()),
                email_disabled: true,
                role: Some(prefill.role),
                invite_token: Some(token.clone()),
                notice: None,
            },
            AuthFlow::SetupAdmin => AuthForm {
                kind: FormKind::SetupAdmin,
                email: None,
                email_disabled: false,
                role: Some(Role::Admin),
                invite_token: None,
                notice: None,
            },
        }
    }
}

pub struct AuthFlowController {
    directory: Arc<dyn Directory>,
    invitations: InvitationValidator,
    lookup_timeout: Duration,
    outcome: OnceCell<AuthFlow>,
}

impl AuthFlowController {
    pub fn new(
        directory: Arc<dyn Directory>,
        invitations: InvitationValidator,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            invitations,
            lookup_timeout,
            outcome: OnceCell::new(),
        }
    }

    pub fn state(&self) -> FlowState {
        self.outcome
            .get()
            .map(AuthFlow::state)
            .unwrap_or(FlowState::Resolving)
    }

    /// Resolve the flow for this entry. Only the first call evaluates.
    pub async fn resolve(&self, invite_token: Option<&str>) -> AuthFlow {
        self.outcome
            .get_or_init(|| self.evaluate(invite_token))
            .await
            .clone()
    }

    async fn evaluate(&self, invite_token: Option<&str>) -> AuthFlow {
        let admin_exists = self.admin_exists().await;
        let token = invite_token.map(str::trim).filter(|t| !t.is_empty());

        match token {
            None if !admin_exists => {
                tracing::info!("No administrator exists; offering first-run setup");
                AuthFlow::SetupAdmin
            }
            None => AuthFlow::Login { notice: None },
            Some(token) => match self.invitations.fetch_invitation(token).await {
                Ok(invitation) => AuthFlow::Invite {
                    token: invitation.token.clone(),
                    prefill: invitation.prefill(),
                },
                Err(e) => {
                    tracing::debug!(error = %e, "Invite token rejected; falling back to sign-in");
                    AuthFlow::Login {
                        notice: Some(INVALID_INVITE_NOTICE.to_string()),
                    }
                }
            },
        }
    }

    /// A failed check counts as "admin exists"
    async fn admin_exists(&self) -> bool {
        match remote_call(
            self.lookup_timeout,
            "admin check",
            self.directory.admin_exists(),
        )
        .await
        {
            Ok(Ok(exists)) => exists,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Admin check failed; assuming an admin exists");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Admin check failed; assuming an admin exists");
                true
            }
        }
    }
}
