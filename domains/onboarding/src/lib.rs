//! Onboarding domain: invitations, auth flow resolution, admin bootstrap

pub mod api;
pub mod domain;

// Re-export domain types at the crate root for convenience
pub use domain::bootstrap::bootstrap_admin;
pub use domain::entities::{generate_invitation_token, Invitation, InvitePrefill};
pub use domain::flow::{AuthFlow, AuthFlowController, AuthForm, FlowState, FormKind};
pub use domain::invitations::{InvitationConfig, InvitationValidator};
pub use domain::state::{
    InvitationEvent, InvitationGuardContext, InvitationState, InvitationStateMachine,
};

// Re-export API types
pub use api::routes;
pub use api::OnboardingState;
