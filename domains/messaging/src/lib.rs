//! Messaging domain: attachment uploads

pub mod api;
pub mod domain;

// Re-export domain types at the crate root for convenience
pub use domain::attachments::{
    Attachment, AttachmentConfig, AttachmentError, AttachmentUploader, MAX_ATTACHMENT_BYTES,
};

// Re-export API types
pub use api::routes;
pub use api::MessagingState;
