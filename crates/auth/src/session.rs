//! Session store
//!
//! Lifecycle-scoped cache of the current identity. One store lives per
//! application root (or per HTTP request on the server); everything that
//! needs "who is signed in" reads through it, so a render makes at most one
//! session check.
//!
//! Every identity change bumps a generation counter. Role lookups and guard
//! resolutions started under an older generation are discarded on completion.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use coachdesk_backend::{BackendError, IdentityProvider, RemoteSession, RemoteUser};
use tokio::sync::watch;

use crate::error::{remote_call, AuthError};
use crate::types::Identity;
use crate::validation::Credentials;

/// Externally-originated session change, e.g. a sign-out in another tab or a
/// background token refresh
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedOut,
    TokenRefreshed {
        access_token: String,
        user: RemoteUser,
    },
}

/// Point-in-time view of the store
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub identity: Option<Identity>,
}

#[derive(Debug, Default)]
struct SessionState {
    access_token: Option<String>,
    identity: Option<Identity>,
    generation: u64,
}

pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    lookup_timeout: Duration,
    state: Mutex<SessionState>,
    /// Serializes remote session checks so concurrent readers share one call
    check_gate: tokio::sync::Mutex<()>,
    changes: watch::Sender<SessionSnapshot>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("SessionStore")
            .field("generation", &snapshot.generation)
            .field("identity", &snapshot.identity)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl SessionStore {
    /// Store with no token: every read resolves to "signed out" until sign-in
    pub fn new(provider: Arc<dyn IdentityProvider>, lookup_timeout: Duration) -> Self {
        let (changes, _) = watch::channel(SessionSnapshot {
            generation: 0,
            identity: None,
        });
        Self {
            provider,
            lookup_timeout,
            state: Mutex::new(SessionState::default()),
            check_gate: tokio::sync::Mutex::new(()),
            changes,
        }
    }

    /// Store seeded with a previously issued access token (cookie or bearer)
    pub fn with_access_token(
        provider: Arc<dyn IdentityProvider>,
        lookup_timeout: Duration,
        access_token: String,
    ) -> Self {
        let store = Self::new(provider, lookup_timeout);
        store.lock().access_token = Some(access_token);
        store
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) {
        self.changes.send_replace(SessionSnapshot {
            generation: state.generation,
            identity: state.identity.clone(),
        });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            generation: state.generation,
            identity: state.identity.clone(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Receive a snapshot after every identity change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.changes.subscribe()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    /// Identity already established in this store, without a network call
    pub fn cached_identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    /// Resolve the signed-in identity.
    ///
    /// Served from the cache once established. Otherwise performs exactly one
    /// bounded session check with the provider; concurrent callers wait on the
    /// same check instead of issuing their own. An unknown or expired token
    /// resolves to `Ok(None)` and is dropped.
    pub async fn get_current_identity(&self) -> Result<Option<Identity>, AuthError> {
        if let Some(identity) = self.cached_identity() {
            return Ok(Some(identity));
        }

        let _gate = self.check_gate.lock().await;

        let (token, generation) = {
            let state = self.lock();
            if let Some(identity) = &state.identity {
                return Ok(Some(identity.clone()));
            }
            match &state.access_token {
                Some(token) => (token.clone(), state.generation),
                None => return Ok(None),
            }
        };

        let user = remote_call(
            self.lookup_timeout,
            "session check",
            self.provider.current_user(&token),
        )
        .await?
        .map_err(|e| {
            tracing::warn!(error = %e, "Session check failed");
            AuthError::from(e)
        })?;

        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!("Session changed during check; keeping newer state");
            return Ok(state.identity.clone());
        }

        match user {
            Some(user) => {
                let identity = Identity::from(user);
                state.identity = Some(identity.clone());
                state.generation += 1;
                self.publish(&state);
                tracing::debug!(user_id = %identity.id, "Session established");
                Ok(Some(identity))
            }
            None => {
                tracing::debug!("Access token rejected; treating as signed out");
                state.access_token = None;
                Ok(None)
            }
        }
    }

    /// Credentialed sign-in. Validates locally before any network call.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let credentials = Credentials::validated(email, password)?;

        let session = remote_call(
            self.lookup_timeout,
            "sign-in",
            self.provider
                .sign_in_with_password(&credentials.email, &credentials.password),
        )
        .await?
        .map_err(|e| match e {
            BackendError::InvalidCredentials => AuthError::InvalidCredentials,
            other => {
                tracing::warn!(error = %other, "Sign-in request failed");
                AuthError::from(other)
            }
        })?;

        let identity = self.establish(session);
        tracing::info!(user_id = %identity.id, "Signed in");
        Ok(identity)
    }

    /// Credentialed registration. `metadata` is stored on the provider's user
    /// record (e.g. `full_name`).
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<Identity, AuthError> {
        let credentials = Credentials::validated(email, password)?;

        let session = remote_call(
            self.lookup_timeout,
            "sign-up",
            self.provider
                .sign_up(&credentials.email, &credentials.password, metadata),
        )
        .await?
        .map_err(|e| match e {
            BackendError::Conflict(_) => AuthError::EmailAlreadyRegistered,
            other => {
                tracing::warn!(error = %other, "Sign-up request failed");
                AuthError::from(other)
            }
        })?;

        let identity = self.establish(session);
        tracing::info!(user_id = %identity.id, "Account created");
        Ok(identity)
    }

    /// Sign out. The local cache is cleared before the remote call, so the
    /// store reads as signed out even when the provider call fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(token) = self.clear() else {
            return Ok(());
        };

        remote_call(self.lookup_timeout, "sign-out", self.provider.sign_out(&token))
            .await?
            .map_err(|e| {
                tracing::warn!(error = %e, "Remote sign-out failed; local session already cleared");
                AuthError::from(e)
            })?;

        tracing::info!("Signed out");
        Ok(())
    }

    /// Drop the cached identity and token without contacting the provider
    pub fn invalidate(&self) {
        self.clear();
    }

    /// Apply an externally-originated session change
    pub fn handle_auth_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedOut => {
                tracing::info!("External sign-out received");
                self.clear();
            }
            AuthEvent::TokenRefreshed { access_token, user } => {
                let mut state = self.lock();
                let same_user = state
                    .identity
                    .as_ref()
                    .is_some_and(|identity| identity.id == user.id);
                state.access_token = Some(access_token);

                if !same_user {
                    tracing::info!(user_id = %user.id, "Token refreshed for a different identity");
                    state.identity = Some(Identity::from(user));
                    state.generation += 1;
                    self.publish(&state);
                }
            }
        }
    }

    fn establish(&self, session: RemoteSession) -> Identity {
        let identity = Identity::from(session.user);
        let mut state = self.lock();
        state.access_token = session.access_token;
        state.identity = Some(identity.clone());
        state.generation += 1;
        self.publish(&state);
        identity
    }

    /// Returns the token that was held, if any
    fn clear(&self) -> Option<String> {
        let mut state = self.lock();
        let token = state.access_token.take();
        state.identity = None;
        state.generation += 1;
        self.publish(&state);
        token
    }
}
