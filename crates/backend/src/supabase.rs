//! Supabase REST Backend Implementation
//!
//! Talks to the three Supabase services over HTTP:
//! - GoTrue (`/auth/v1`) for sessions and credentials
//! - PostgREST (`/rest/v1`) for the `user_roles` and `invitations` tables
//! - Storage (`/storage/v1`) for attachment objects

use chrono::Utc;
use coachdesk_common::Role;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    BackendConfig, BackendError, Directory, IdentityProvider, InvitationRecord, InvitationStore,
    NewInvitation, ObjectStorage, RemoteSession, RemoteUser,
};

/// GoTrue token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: RemoteUser,
}

/// GoTrue sign-up returns a session when auto-confirm is on, a bare user otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(RemoteUser),
}

/// GoTrue error body. Older deployments use `error_description`, newer `msg`.
#[derive(Debug, Default, Deserialize)]
struct GoTrueError {
    error_code: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl GoTrueError {
    fn text(&self) -> String {
        self.msg
            .clone()
            .or_else(|| self.error_description.clone())
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: Role,
}

/// Supabase-backed implementation of every backend seam
pub struct SupabaseBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        if config.supabase_url.is_empty() {
            return Err(BackendError::Configuration(
                "SUPABASE_URL is required for the supabase provider".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BackendError::Configuration(e.to_string()))?;

        let service_key = config
            .service_role_key
            .clone()
            .unwrap_or_else(|| config.anon_key.clone());

        Ok(Self {
            http,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key,
            service_key,
        })
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
    }

    fn rest_request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
        request
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let status = response.status().as_u16();
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Response {
                status,
                message: format!("Failed to decode response body: {}", e),
            })
    }

    async fn unexpected(response: Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());
        BackendError::Response {
            status,
            message: body,
        }
    }

    async fn gotrue_error(response: Response) -> (StatusCode, GoTrueError) {
        let status = response.status();
        let body = response.json::<GoTrueError>().await.unwrap_or_default();
        (status, body)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SupabaseBackend {
    async fn current_user(&self, access_token: &str) -> Result<Option<RemoteUser>, BackendError> {
        let response =
            Self::send(self.auth_request(Method::GET, "user").bearer_auth(access_token)).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => Ok(Some(Self::decode(response).await?)),
            _ => Err(Self::unexpected(response).await),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, BackendError> {
        let request = self
            .auth_request(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        let response = Self::send(request).await?;

        if !response.status().is_success() {
            let (status, error) = Self::gotrue_error(response).await;
            if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
                tracing::debug!(error_code = ?error.error_code, "Sign-in rejected by GoTrue");
                return Err(BackendError::InvalidCredentials);
            }
            return Err(BackendError::Response {
                status: status.as_u16(),
                message: error.text(),
            });
        }

        let token: TokenResponse = Self::decode(response).await?;
        Ok(RemoteSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: token.user,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<RemoteSession, BackendError> {
        let request = self.auth_request(Method::POST, "signup").json(&serde_json::json!({
            "email": email,
            "password": password,
            "data": metadata,
        }));
        let response = Self::send(request).await?;

        if !response.status().is_success() {
            let (status, error) = Self::gotrue_error(response).await;
            let text = error.text();
            let already_exists = matches!(
                error.error_code.as_deref(),
                Some("user_already_exists" | "email_exists")
            ) || text.to_lowercase().contains("already registered");
            if already_exists {
                return Err(BackendError::Conflict(text));
            }
            if status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::BAD_REQUEST {
                tracing::debug!(error_code = ?error.error_code, "Sign-up rejected by GoTrue");
                return Err(BackendError::Rejected(text));
            }
            return Err(BackendError::Response {
                status: status.as_u16(),
                message: text,
            });
        }

        match Self::decode::<SignUpResponse>(response).await? {
            SignUpResponse::Session(token) => Ok(RemoteSession {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                user: token.user,
            }),
            SignUpResponse::User(user) => Ok(RemoteSession {
                access_token: None,
                refresh_token: None,
                user,
            }),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response =
            Self::send(self.auth_request(Method::POST, "logout").bearer_auth(access_token)).await?;

        // An already-invalid token means there is nothing left to revoke
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(Self::unexpected(response).await)
        }
    }
}

#[async_trait::async_trait]
impl Directory for SupabaseBackend {
    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<Role>, BackendError> {
        let request = self.rest_request(Method::GET, "user_roles").query(&[
            ("user_id", format!("eq.{}", user_id)),
            ("select", "role".to_string()),
            ("limit", "1".to_string()),
        ]);
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        let rows: Vec<RoleRow> = Self::decode(response).await?;
        Ok(rows.into_iter().next().map(|row| row.role))
    }

    async fn assign_role(&self, user_id: Uuid, role: Role) -> Result<(), BackendError> {
        let request = self
            .rest_request(Method::POST, "user_roles")
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&serde_json::json!({ "user_id": user_id, "role": role }));
        let response = Self::send(request).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::unexpected(response).await)
        }
    }

    async fn admin_exists(&self) -> Result<bool, BackendError> {
        let request = self.rest_request(Method::GET, "user_roles").query(&[
            ("role", "eq.admin"),
            ("select", "user_id"),
            ("limit", "1"),
        ]);
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        let rows: Vec<serde_json::Value> = Self::decode(response).await?;
        Ok(!rows.is_empty())
    }

    async fn claim_first_admin(&self, user_id: Uuid) -> Result<(), BackendError> {
        // The function inserts the admin row only while none exists, under a
        // table lock, and reports whether it did.
        let request = self
            .rest_request(Method::POST, "rpc/claim_first_admin")
            .json(&serde_json::json!({ "candidate": user_id }));
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        let claimed: bool = Self::decode(response).await?;
        if claimed {
            Ok(())
        } else {
            Err(BackendError::Conflict("An admin already exists".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl InvitationStore for SupabaseBackend {
    async fn find_by_token(&self, token: &str) -> Result<Option<InvitationRecord>, BackendError> {
        let request = self
            .rest_request(Method::GET, "invitations")
            .query(&[("token", format!("eq.{}", token)), ("select", "*".to_string())]);
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        let rows: Vec<InvitationRecord> = Self::decode(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<InvitationRecord>, BackendError> {
        let request = self
            .rest_request(Method::GET, "invitations")
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        Self::decode(response).await
    }

    async fn create(&self, invitation: NewInvitation) -> Result<InvitationRecord, BackendError> {
        let request = self
            .rest_request(Method::POST, "invitations")
            .header("Prefer", "return=representation")
            .json(&invitation);
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        let rows: Vec<InvitationRecord> = Self::decode(response).await?;
        rows.into_iter().next().ok_or_else(|| BackendError::Response {
            status: 201,
            message: "Insert returned no invitation row".to_string(),
        })
    }

    async fn delete(&self, invitation_id: Uuid) -> Result<(), BackendError> {
        let request = self
            .rest_request(Method::DELETE, "invitations")
            .query(&[("id", format!("eq.{}", invitation_id))]);
        let response = Self::send(request).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::unexpected(response).await)
        }
    }

    async fn accept(&self, token: &str, user_id: Uuid) -> Result<InvitationRecord, BackendError> {
        let now = Utc::now();
        // Conditional update: only a row that is still pending and unexpired matches,
        // so of two racing accepts exactly one gets a row back.
        let request = self
            .rest_request(Method::PATCH, "invitations")
            .query(&[
                ("token", format!("eq.{}", token)),
                ("status", "eq.pending".to_string()),
                ("expires_at", format!("gt.{}", now.to_rfc3339())),
            ])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "status": "accepted",
                "accepted_by": user_id,
                "accepted_at": now,
            }));
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        let rows: Vec<InvitationRecord> = Self::decode(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Conflict("Invitation is no longer pending".to_string()))
    }
}

#[async_trait::async_trait]
impl ObjectStorage for SupabaseBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let request = self
            .http
            .post(format!(
                "{}/storage/v1/object/{}/{}",
                self.base_url, bucket, path
            ))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);
        let response = Self::send(request).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected(response).await);
        }

        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        ))
    }
}
