//! Onboarding domain state and auth backend integration

use std::sync::Arc;

use axum::extract::FromRef;
use coachdesk_auth::AuthBackend;
use tokio::sync::Mutex;

use crate::domain::flow::AuthFlowController;
use crate::domain::invitations::InvitationValidator;

/// Application state for the Onboarding domain
#[derive(Clone)]
pub struct OnboardingState {
    pub auth: AuthBackend,
    pub invitations: InvitationValidator,
    /// Held for the whole admin bootstrap so this process runs one at a time
    pub setup_gate: Arc<Mutex<()>>,
}

impl OnboardingState {
    pub fn new(auth: AuthBackend, invitations: InvitationValidator) -> Self {
        Self {
            auth,
            invitations,
            setup_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Fresh controller: flow resolution happens once per entry
    pub fn flow_controller(&self) -> AuthFlowController {
        AuthFlowController::new(
            self.auth.directory().clone(),
            self.invitations.clone(),
            self.auth.config().lookup_timeout,
        )
    }
}

impl FromRef<OnboardingState> for AuthBackend {
    fn from_ref(state: &OnboardingState) -> Self {
        state.auth.clone()
    }
}
