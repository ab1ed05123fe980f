//! Messaging domain state and auth backend integration

use axum::extract::FromRef;
use coachdesk_auth::AuthBackend;

use crate::domain::attachments::AttachmentUploader;

/// Application state for the Messaging domain
#[derive(Clone)]
pub struct MessagingState {
    pub auth: AuthBackend,
    pub attachments: AttachmentUploader,
}

impl FromRef<MessagingState> for AuthBackend {
    fn from_ref(state: &MessagingState) -> Self {
        state.auth.clone()
    }
}
