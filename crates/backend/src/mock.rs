//! Mock Backend Implementation
//!
//! In-memory stand-in for the backend-as-a-service, used by tests and by the
//! local server when `BACKEND_PROVIDER=mock`. Thread-safe via `Arc<Mutex<>>`.
//! Each operation can be given an artificial latency or a forced failure, and
//! every call is counted so tests can assert that no network call was issued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use coachdesk_common::Role;
use uuid::Uuid;

use crate::{
    BackendError, Directory, IdentityProvider, InvitationRecord, InvitationStatus,
    InvitationStore, NewInvitation, ObjectStorage, RemoteSession, RemoteUser,
};

/// Operations exposed by the mock, used as keys for latency, failures and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    CurrentUser,
    SignIn,
    SignUp,
    SignOut,
    FetchRole,
    AssignRole,
    AdminExists,
    ClaimFirstAdmin,
    FindInvitation,
    ListInvitations,
    CreateInvitation,
    DeleteInvitation,
    AcceptInvitation,
    Upload,
}

#[derive(Debug, Clone)]
struct MockAccount {
    user: RemoteUser,
    password: String,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub path: String,
    pub size: usize,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct MockState {
    accounts: HashMap<String, MockAccount>,
    tokens: HashMap<String, Uuid>,
    roles: HashMap<Uuid, Role>,
    invitations: Vec<InvitationRecord>,
    objects: Vec<StoredObject>,
    latency: HashMap<MockOperation, Duration>,
    failures: HashMap<MockOperation, BackendError>,
    calls: HashMap<MockOperation, usize>,
}

/// In-memory backend that records calls for test assertions
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create an empty mock backend
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, BackendError> {
        self.state
            .lock()
            .map_err(|e| BackendError::Request(format!("mock state lock poisoned: {e}")))
    }

    fn lock_for_test(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .expect("mock state lock poisoned - prior test panicked")
    }

    /// Count the call, apply configured latency, then surface a forced failure.
    ///
    /// The lock is released before sleeping so concurrent calls interleave the
    /// way real network calls would.
    async fn enter(&self, op: MockOperation) -> Result<(), BackendError> {
        let delay = {
            let mut state = self.lock()?;
            *state.calls.entry(op).or_insert(0) += 1;
            state.latency.get(&op).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.lock()?.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Register an account that can sign in immediately
    pub fn seed_account(&self, email: &str, password: &str, role: Option<Role>) -> Uuid {
        let id = Uuid::new_v4();
        let mut state = self.lock_for_test();
        state.accounts.insert(
            email.to_lowercase(),
            MockAccount {
                user: RemoteUser {
                    id,
                    email: email.to_string(),
                    user_metadata: serde_json::json!({}),
                },
                password: password.to_string(),
            },
        );
        if let Some(role) = role {
            state.roles.insert(id, role);
        }
        id
    }

    /// Insert an invitation row as-is
    pub fn seed_invitation(&self, record: InvitationRecord) {
        self.lock_for_test().invitations.push(record);
    }

    /// Mint an access token for an existing account without going through sign-in
    pub fn issue_token(&self, user_id: Uuid) -> String {
        let token = format!("mock-at-{}", Uuid::new_v4());
        self.lock_for_test().tokens.insert(token.clone(), user_id);
        token
    }

    /// Invalidate every token held by a user (external sign-out)
    pub fn revoke_tokens_for(&self, user_id: Uuid) {
        self.lock_for_test().tokens.retain(|_, id| *id != user_id);
    }

    pub fn set_role(&self, user_id: Uuid, role: Option<Role>) {
        let mut state = self.lock_for_test();
        match role {
            Some(role) => state.roles.insert(user_id, role),
            None => state.roles.remove(&user_id),
        };
    }

    pub fn set_latency(&self, op: MockOperation, delay: Duration) {
        self.lock_for_test().latency.insert(op, delay);
    }

    /// Force every subsequent call of `op` to fail with `err`
    pub fn fail(&self, op: MockOperation, err: BackendError) {
        self.lock_for_test().failures.insert(op, err);
    }

    pub fn clear_failure(&self, op: MockOperation) {
        self.lock_for_test().failures.remove(&op);
    }

    /// Number of times `op` has been called
    pub fn calls(&self, op: MockOperation) -> usize {
        self.lock_for_test().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total calls across every operation
    pub fn total_calls(&self) -> usize {
        self.lock_for_test().calls.values().sum()
    }

    pub fn invitation(&self, token: &str) -> Option<InvitationRecord> {
        self.lock_for_test()
            .invitations
            .iter()
            .find(|i| i.token == token)
            .cloned()
    }

    /// Number of identities currently holding `role`
    pub fn role_count(&self, role: Role) -> usize {
        self.lock_for_test()
            .roles
            .values()
            .filter(|r| **r == role)
            .count()
    }

    pub fn stored_objects(&self) -> Vec<StoredObject> {
        self.lock_for_test().objects.clone()
    }

    fn new_session(state: &mut MockState, user: RemoteUser) -> RemoteSession {
        let access_token = format!("mock-at-{}", Uuid::new_v4());
        state.tokens.insert(access_token.clone(), user.id);
        RemoteSession {
            access_token: Some(access_token),
            refresh_token: Some(format!("mock-rt-{}", Uuid::new_v4())),
            user,
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockBackend {
    async fn current_user(&self, access_token: &str) -> Result<Option<RemoteUser>, BackendError> {
        self.enter(MockOperation::CurrentUser).await?;
        let state = self.lock()?;
        let user = state.tokens.get(access_token).and_then(|id| {
            state
                .accounts
                .values()
                .find(|a| a.user.id == *id)
                .map(|a| a.user.clone())
        });
        Ok(user)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, BackendError> {
        self.enter(MockOperation::SignIn).await?;
        let mut state = self.lock()?;
        let user = match state.accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(BackendError::InvalidCredentials),
        };
        Ok(Self::new_session(&mut state, user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<RemoteSession, BackendError> {
        self.enter(MockOperation::SignUp).await?;
        let mut state = self.lock()?;
        let key = email.to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(BackendError::Conflict("User already registered".to_string()));
        }

        let user = RemoteUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            user_metadata: metadata,
        };
        state.accounts.insert(
            key,
            MockAccount {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        Ok(Self::new_session(&mut state, user))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.enter(MockOperation::SignOut).await?;
        self.lock()?.tokens.remove(access_token);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Directory for MockBackend {
    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<Role>, BackendError> {
        self.enter(MockOperation::FetchRole).await?;
        Ok(self.lock()?.roles.get(&user_id).copied())
    }

    async fn assign_role(&self, user_id: Uuid, role: Role) -> Result<(), BackendError> {
        self.enter(MockOperation::AssignRole).await?;
        self.lock()?.roles.insert(user_id, role);
        Ok(())
    }

    async fn admin_exists(&self) -> Result<bool, BackendError> {
        self.enter(MockOperation::AdminExists).await?;
        Ok(self.lock()?.roles.values().any(|r| *r == Role::Admin))
    }

    async fn claim_first_admin(&self, user_id: Uuid) -> Result<(), BackendError> {
        self.enter(MockOperation::ClaimFirstAdmin).await?;
        let mut state = self.lock()?;
        if state.roles.values().any(|r| *r == Role::Admin) {
            return Err(BackendError::Conflict("An admin already exists".to_string()));
        }
        state.roles.insert(user_id, Role::Admin);
        Ok(())
    }
}

#[async_trait::async_trait]
impl InvitationStore for MockBackend {
    async fn find_by_token(&self, token: &str) -> Result<Option<InvitationRecord>, BackendError> {
        self.enter(MockOperation::FindInvitation).await?;
        Ok(self
            .lock()?
            .invitations
            .iter()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<InvitationRecord>, BackendError> {
        self.enter(MockOperation::ListInvitations).await?;
        let mut rows = self.lock()?.invitations.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create(&self, invitation: NewInvitation) -> Result<InvitationRecord, BackendError> {
        self.enter(MockOperation::CreateInvitation).await?;
        let mut state = self.lock()?;
        if state.invitations.iter().any(|i| i.token == invitation.token) {
            return Err(BackendError::Conflict("Duplicate invitation token".to_string()));
        }

        let record = InvitationRecord {
            id: Uuid::new_v4(),
            token: invitation.token,
            email: invitation.email,
            role: invitation.role,
            status: InvitationStatus::Pending,
            expires_at: invitation.expires_at,
            invited_by: invitation.invited_by,
            created_at: Utc::now(),
        };
        state.invitations.push(record.clone());
        Ok(record)
    }

    async fn delete(&self, invitation_id: Uuid) -> Result<(), BackendError> {
        self.enter(MockOperation::DeleteInvitation).await?;
        self.lock()?.invitations.retain(|i| i.id != invitation_id);
        Ok(())
    }

    async fn accept(&self, token: &str, _user_id: Uuid) -> Result<InvitationRecord, BackendError> {
        self.enter(MockOperation::AcceptInvitation).await?;
        let mut state = self.lock()?;
        let now = Utc::now();
        let record = state
            .invitations
            .iter_mut()
            .find(|i| i.token == token && i.status == InvitationStatus::Pending && i.expires_at > now)
            .ok_or_else(|| BackendError::Conflict("Invitation is no longer pending".to_string()))?;
        record.status = InvitationStatus::Accepted;
        Ok(record.clone())
    }
}

#[async_trait::async_trait]
impl ObjectStorage for MockBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        self.enter(MockOperation::Upload).await?;
        self.lock()?.objects.push(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            size: bytes.len(),
            content_type: content_type.to_string(),
        });
        Ok(format!("https://mock.storage.local/{}/{}", bucket, path))
    }
}
