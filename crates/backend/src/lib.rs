//! Coachdesk Backend Service
//!
//! Thin client over the backend-as-a-service that owns persistent storage,
//! password hashing, token issuance, and row-level security. Provides:
//! - Trait seams for identity, role directory, invitations, and object storage
//! - Supabase REST implementation for production
//! - In-memory mock backend for testing and local development

use std::sync::Arc;

use chrono::{DateTime, Utc};
use coachdesk_common::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod mock;
pub mod supabase;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Backend configuration error: {0}")]
    Configuration(String),

    #[error("Backend request error: {0}")]
    Request(String),

    #[error("Backend response error ({status}): {message}")]
    Response { status: u16, message: String },

    #[error("Credentials rejected by identity provider")]
    InvalidCredentials,

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input refused by the provider's own policy (password strength, email format)
    #[error("Rejected by provider: {0}")]
    Rejected(String),

    #[error("Access token rejected")]
    Unauthorized,
}

/// User record as returned by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// Outcome of a credentialed sign-in or sign-up
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSession {
    /// Absent when the provider requires email confirmation before issuing tokens
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: RemoteUser,
}

/// Invitation status as persisted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

/// Invitation row (read model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationRecord {
    pub id: Uuid,
    pub token: String,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub invited_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new invitation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewInvitation {
    pub token: String,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    pub invited_by: Uuid,
}

/// Session check, credentialed sign-in/sign-up, and sign-out
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the user behind an access token. `Ok(None)` when the token is
    /// unknown or expired.
    async fn current_user(&self, access_token: &str) -> Result<Option<RemoteUser>, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<RemoteSession, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;
}

/// Authoritative role lookup
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<Role>, BackendError>;

    async fn assign_role(&self, user_id: Uuid, role: Role) -> Result<(), BackendError>;

    /// Whether at least one admin-role identity exists
    async fn admin_exists(&self) -> Result<bool, BackendError>;

    /// Atomically grant the admin role if no admin exists yet.
    ///
    /// Returns `BackendError::Conflict` when an admin already exists,
    /// including when a concurrent claim won.
    async fn claim_first_admin(&self, user_id: Uuid) -> Result<(), BackendError>;
}

/// Invitation record CRUD plus the combined accept operation
#[async_trait::async_trait]
pub trait InvitationStore: Send + Sync {
    async fn find_by_token(&self, token: &str) -> Result<Option<InvitationRecord>, BackendError>;

    async fn list(&self) -> Result<Vec<InvitationRecord>, BackendError>;

    async fn create(&self, invitation: NewInvitation) -> Result<InvitationRecord, BackendError>;

    async fn delete(&self, invitation_id: Uuid) -> Result<(), BackendError>;

    /// Atomically move a pending invitation to accepted.
    ///
    /// Returns `BackendError::Conflict` if the invitation was not pending at
    /// the time of the update, including when a concurrent accept won.
    async fn accept(&self, token: &str, user_id: Uuid) -> Result<InvitationRecord, BackendError>;
}

/// Binary object storage with public URLs
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError>;
}

/// The full collaborator surface in one type
pub trait Backend: IdentityProvider + Directory + InvitationStore + ObjectStorage {}

impl<T> Backend for T where T: IdentityProvider + Directory + InvitationStore + ObjectStorage {}

/// Trait-object handles to each collaborator seam, sharing one backend instance
#[derive(Clone)]
pub struct BackendServices {
    pub identity: Arc<dyn IdentityProvider>,
    pub directory: Arc<dyn Directory>,
    pub invitations: Arc<dyn InvitationStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl BackendServices {
    pub fn from_shared<B: Backend + 'static>(backend: Arc<B>) -> Self {
        Self {
            identity: backend.clone(),
            directory: backend.clone(),
            invitations: backend.clone(),
            storage: backend,
        }
    }
}

/// Backend service configuration
#[derive(Clone)]
pub struct BackendConfig {
    /// Backend provider (supabase, mock)
    pub provider: String,
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: String,
    /// Optional service-role key for server-side table access
    pub service_role_key: Option<String>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("supabase_url", &self.supabase_url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl BackendConfig {
    /// Create backend config from environment variables
    pub fn from_env() -> Result<Self, BackendError> {
        dotenvy::dotenv().ok();

        let provider = std::env::var("BACKEND_PROVIDER").unwrap_or_else(|_| "mock".to_string());
        let supabase_url = std::env::var("SUPABASE_URL").unwrap_or_default();
        let anon_key = std::env::var("SUPABASE_ANON_KEY").unwrap_or_default();
        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY").ok();

        if provider == "supabase" && (supabase_url.is_empty() || anon_key.is_empty()) {
            return Err(BackendError::Configuration(
                "SUPABASE_URL and SUPABASE_ANON_KEY are required for the supabase provider"
                    .to_string(),
            ));
        }

        Ok(Self {
            provider,
            supabase_url,
            anon_key,
            service_role_key,
        })
    }
}

/// Factory for creating backend implementations
pub struct BackendFactory;

impl BackendFactory {
    /// Create backend services based on configuration
    pub fn create(config: BackendConfig) -> Result<BackendServices, BackendError> {
        match config.provider.as_str() {
            "supabase" => {
                tracing::info!(url = %config.supabase_url, "Creating Supabase backend");
                let backend = supabase::SupabaseBackend::new(config)?;
                Ok(BackendServices::from_shared(Arc::new(backend)))
            }
            "mock" => {
                tracing::info!("Creating mock backend");
                Ok(BackendServices::from_shared(Arc::new(
                    mock::MockBackend::new(),
                )))
            }
            provider => Err(BackendError::Configuration(format!(
                "Unknown backend provider: {}. Supported providers: supabase, mock",
                provider
            ))),
        }
    }
}
