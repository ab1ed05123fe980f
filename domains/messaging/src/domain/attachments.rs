//! Message attachment uploads

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coachdesk_backend::ObjectStorage;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Maximum attachment size (10 MiB)
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_BUCKET: &str = "attachments";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("Attachment is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Attachment is empty")]
    Empty,

    #[error("Malformed upload: {0}")]
    Malformed(String),

    #[error("Attachments require a role")]
    NotPermitted,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Upload timed out")]
    Timeout,
}

impl AttachmentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AttachmentError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AttachmentError::Empty | AttachmentError::Malformed(_) => StatusCode::BAD_REQUEST,
            AttachmentError::NotPermitted => StatusCode::FORBIDDEN,
            AttachmentError::Upload(_) => StatusCode::BAD_GATEWAY,
            AttachmentError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AttachmentError::TooLarge { .. } => "ATTACHMENT_TOO_LARGE",
            AttachmentError::Empty => "ATTACHMENT_EMPTY",
            AttachmentError::Malformed(_) => "VALIDATION_ERROR",
            AttachmentError::NotPermitted => "FORBIDDEN",
            AttachmentError::Upload(_) => "UPLOAD_FAILED",
            AttachmentError::Timeout => "UPSTREAM_TIMEOUT",
        }
    }
}

impl IntoResponse for AttachmentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Attachment request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "dismissible": true,
            }
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    pub bucket: String,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

impl AttachmentConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bucket = std::env::var("ATTACHMENTS_BUCKET")
            .ok()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        Self { bucket }
    }
}

/// Stored attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Publicly resolvable URL
    pub url: String,
    pub path: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
}

/// Rejects a size over the limit; callers check before buffering more.
pub fn check_size(size: usize) -> Result<(), AttachmentError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge {
            size,
            max: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

/// Keep object keys to a conservative character set
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}

#[derive(Clone)]
pub struct AttachmentUploader {
    storage: Arc<dyn ObjectStorage>,
    config: AttachmentConfig,
    timeout: Duration,
}

impl AttachmentUploader {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: AttachmentConfig, timeout: Duration) -> Self {
        Self {
            storage,
            config,
            timeout,
        }
    }

    pub fn config(&self) -> &AttachmentConfig {
        &self.config
    }

    /// Upload a file under the owner's prefix.
    ///
    /// The size limit is enforced here before storage is contacted.
    pub async fn upload(
        &self,
        owner: Uuid,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Attachment, AttachmentError> {
        let size = bytes.len();
        check_size(size)?;
        if size == 0 {
            return Err(AttachmentError::Empty);
        }

        let file_name = sanitize_file_name(file_name);
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or("application/octet-stream")
            .to_string();
        let path = format!("{}/{}-{}", owner, Uuid::new_v4(), file_name);

        let upload = self
            .storage
            .upload(&self.config.bucket, &path, bytes, &content_type);
        let url = match tokio::time::timeout(self.timeout, upload).await {
            Ok(Ok(url)) => url,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %owner, error = %e, "Attachment upload rejected by storage");
                return Err(AttachmentError::Upload(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(user_id = %owner, timeout_secs = self.timeout.as_secs(), "Attachment upload timed out");
                return Err(AttachmentError::Timeout);
            }
        };

        tracing::info!(user_id = %owner, path = %path, size_bytes = size, "Attachment uploaded");
        Ok(Attachment {
            url,
            path,
            file_name,
            content_type,
            size_bytes: size,
        })
    }
}
