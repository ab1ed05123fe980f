//! Route definitions for Messaging domain API

use axum::{extract::DefaultBodyLimit, routing::post, Router};

use super::handlers::attachments;
use super::middleware::MessagingState;
use crate::domain::attachments::MAX_ATTACHMENT_BYTES;

/// Create attachment routes.
///
/// The transport limit sits above the attachment limit so oversized files
/// reach the typed size check instead of a bare 413.
fn attachment_routes() -> Router<MessagingState> {
    Router::new().route(
        "/v1/attachments",
        post(attachments::upload_attachment)
            .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES * 2)),
    )
}

/// Create all Messaging domain API routes
pub fn routes() -> Router<MessagingState> {
    Router::new().merge(attachment_routes())
}
