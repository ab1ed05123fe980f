//! Role resolution
//!
//! The role directory is the only source of truth for roles. Client-supplied
//! role claims are never consulted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use coachdesk_backend::Directory;
use coachdesk_common::Role;
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::SessionStore;
use crate::types::{Principal, RoleFlags};

/// Result of resolving the role for the store's current identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOutcome {
    /// `None` when no identity is signed in
    Resolved(Option<Principal>),
    /// The identity changed while the lookup was in flight; the result was
    /// discarded
    Superseded,
}

#[derive(Debug, Clone, Copy)]
struct CachedRole {
    generation: u64,
    identity_id: Uuid,
    role: Option<Role>,
}

pub struct RoleResolver {
    directory: Arc<dyn Directory>,
    lookup_timeout: Duration,
    cache: Mutex<Option<CachedRole>>,
}

impl RoleResolver {
    pub fn new(directory: Arc<dyn Directory>, lookup_timeout: Duration) -> Self {
        Self {
            directory,
            lookup_timeout,
            cache: Mutex::new(None),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Option<CachedRole>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Single bounded directory lookup. `Ok(None)` means the identity has no
    /// role row.
    pub async fn resolve_role(&self, identity_id: Uuid) -> Result<Option<Role>, AuthError> {
        match tokio::time::timeout(self.lookup_timeout, self.directory.fetch_role(identity_id))
            .await
        {
            Ok(Ok(role)) => Ok(role),
            Ok(Err(e)) => {
                tracing::warn!(user_id = %identity_id, error = %e, "Role lookup failed");
                Err(AuthError::RoleLookupFailure(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(user_id = %identity_id, "Role lookup timed out");
                Err(AuthError::Timeout("role lookup"))
            }
        }
    }

    /// Resolve the role for whatever identity `session` currently holds.
    ///
    /// Cached per session generation, so repeated reads for the same identity
    /// cost one lookup. A lookup that completes after the identity changed is
    /// reported as `Superseded` and never cached or returned.
    pub async fn resolve_for(&self, session: &SessionStore) -> Result<RoleOutcome, AuthError> {
        let snapshot = session.snapshot();
        let Some(identity) = snapshot.identity else {
            self.invalidate();
            return Ok(RoleOutcome::Resolved(None));
        };

        let cached = *self.cache();
        if let Some(cached) = cached {
            if cached.generation == snapshot.generation && cached.identity_id == identity.id {
                return Ok(RoleOutcome::Resolved(Some(Principal {
                    identity,
                    role: cached.role,
                })));
            }
        }

        let result = self.resolve_role(identity.id).await;

        if session.generation() != snapshot.generation {
            tracing::debug!(
                user_id = %identity.id,
                "Identity changed during role lookup; discarding result"
            );
            return Ok(RoleOutcome::Superseded);
        }

        let role = result?;
        *self.cache() = Some(CachedRole {
            generation: snapshot.generation,
            identity_id: identity.id,
            role,
        });

        Ok(RoleOutcome::Resolved(Some(Principal { identity, role })))
    }

    /// Flags for the cached role, all false when nothing is cached
    pub fn flags(&self) -> RoleFlags {
        RoleFlags::from((*self.cache()).and_then(|cached| cached.role))
    }

    pub fn invalidate(&self) {
        *self.cache() = None;
    }
}
