//! Auth backend handle
//!
//! Bundles the identity provider, role directory, and auth configuration.
//! Each request or view builds its own `SessionStore` through it.
//!
//! Domain states expose this via `FromRef`:
//! ```ignore
//! impl FromRef<MyDomainState> for AuthBackend {
//!     fn from_ref(state: &MyDomainState) -> Self {
//!         state.auth.clone()
//!     }
//! }
//! ```

use std::sync::Arc;

use coachdesk_backend::{Directory, IdentityProvider};

use crate::config::AuthConfig;
use crate::guard::RouteGuard;
use crate::roles::RoleResolver;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AuthBackend {
    identity: Arc<dyn IdentityProvider>,
    directory: Arc<dyn Directory>,
    config: AuthConfig,
}

impl AuthBackend {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        directory: Arc<dyn Directory>,
        config: AuthConfig,
    ) -> Self {
        Self {
            identity,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<dyn Directory> {
        &self.directory
    }

    /// Fresh session store, seeded with `access_token` when one was presented
    pub fn session(&self, access_token: Option<String>) -> Arc<SessionStore> {
        let provider = self.identity.clone();
        let timeout = self.config.lookup_timeout;
        Arc::new(match access_token {
            Some(token) => SessionStore::with_access_token(provider, timeout, token),
            None => SessionStore::new(provider, timeout),
        })
    }

    pub fn roles(&self) -> Arc<RoleResolver> {
        Arc::new(RoleResolver::new(
            self.directory.clone(),
            self.config.lookup_timeout,
        ))
    }

    pub fn guard_for(&self, session: Arc<SessionStore>) -> RouteGuard {
        RouteGuard::new(session, self.roles(), self.config.clone())
    }
}
