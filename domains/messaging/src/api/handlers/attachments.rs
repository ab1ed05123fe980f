//! Attachment API handlers
//!
//! Implements:
//! - POST /v1/attachments - Upload one file from a multipart `file` field

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use coachdesk_auth::AuthUser;

use crate::api::middleware::MessagingState;
use crate::domain::attachments::{check_size, Attachment, AttachmentError};

const FILE_FIELD: &str = "file";

/// POST /v1/attachments
///
/// Chunks are counted as they arrive so an oversized file is refused without
/// buffering it whole.
pub async fn upload_attachment(
    State(state): State<MessagingState>,
    AuthUser(principal): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Attachment>), AttachmentError> {
    if principal.role.is_none() {
        return Err(AttachmentError::NotPermitted);
    }
    let mut multipart = multipart.map_err(|e| AttachmentError::Malformed(e.body_text()))?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AttachmentError::Malformed(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AttachmentError::Malformed(e.body_text()))?
        {
            check_size(bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        let attachment = state
            .attachments
            .upload(
                principal.identity.id,
                &file_name,
                content_type.as_deref(),
                bytes,
            )
            .await?;
        return Ok((StatusCode::CREATED, Json(attachment)));
    }

    Err(AttachmentError::Malformed(format!(
        "missing `{}` field",
        FILE_FIELD
    )))
}
