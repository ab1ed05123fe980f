//! Route guard
//!
//! `decide_access` is the single place a route decision is made. `RouteGuard`
//! drives it: resolve the session, then the role, and only then decide.

use std::sync::Arc;

use coachdesk_common::Role;

use crate::config::AuthConfig;
use crate::mount::GuardMount;
use crate::roles::{RoleOutcome, RoleResolver};
use crate::session::SessionStore;
use crate::types::{Identity, Principal};

/// Re-resolutions allowed when the identity keeps changing mid-lookup
const MAX_SUPERSEDED_RETRIES: usize = 3;

/// A protected route and the roles allowed to see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequirement {
    pub path: String,
    pub allowed: Vec<Role>,
}

impl RouteRequirement {
    pub fn new(path: impl Into<String>, allowed: &[Role]) -> Self {
        Self {
            path: path.into(),
            allowed: allowed.to_vec(),
        }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    RedirectTo(String),
}

/// Decide access for a fully resolved identity and role.
///
/// - no identity: the login path
/// - identity without an allowed role: the role's own home, or the fallback
///   when there is no role
/// - a redirect that would land back on the requested path goes to the
///   fallback instead
pub fn decide_access(
    identity: Option<&Identity>,
    role: Option<Role>,
    requirement: &RouteRequirement,
    config: &AuthConfig,
) -> AccessDecision {
    if identity.is_none() {
        return AccessDecision::RedirectTo(config.login_path.clone());
    }

    match role {
        Some(role) if requirement.allows(role) => AccessDecision::Allow,
        Some(role) => {
            let home = config.home_for(role);
            if home == requirement.path {
                AccessDecision::RedirectTo(config.fallback_path.clone())
            } else {
                AccessDecision::RedirectTo(home.to_string())
            }
        }
        None => AccessDecision::RedirectTo(config.fallback_path.clone()),
    }
}

/// Async driver for `decide_access` over one session
#[derive(Clone)]
pub struct RouteGuard {
    session: Arc<SessionStore>,
    roles: Arc<RoleResolver>,
    config: AuthConfig,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionStore>, roles: Arc<RoleResolver>, config: AuthConfig) -> Self {
        Self {
            session,
            roles,
            config,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Resolve identity and role, failing closed.
    ///
    /// A failed session check reads as signed out and a failed role lookup
    /// reads as no role. Returns `None` when nobody is signed in.
    pub async fn resolve(&self) -> Option<Principal> {
        for _ in 0..MAX_SUPERSEDED_RETRIES {
            match self.session.get_current_identity().await {
                Ok(Some(_)) => {}
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!(error = %e, "Session resolution failed; treating as signed out");
                    return None;
                }
            }

            match self.roles.resolve_for(&self.session).await {
                Ok(RoleOutcome::Resolved(principal)) => return principal,
                Ok(RoleOutcome::Superseded) => continue,
                Err(e) => {
                    let identity = self.session.cached_identity()?;
                    tracing::warn!(
                        user_id = %identity.id,
                        error = %e,
                        "Role resolution failed; denying role-gated access"
                    );
                    return Some(Principal {
                        identity,
                        role: None,
                    });
                }
            }
        }

        tracing::warn!("Identity kept changing during resolution; treating as signed out");
        None
    }

    /// Resolve fully, then decide
    pub async fn check(&self, requirement: &RouteRequirement) -> AccessDecision {
        let principal = self.resolve().await;
        self.decide(principal.as_ref(), requirement)
    }

    pub fn decide(
        &self,
        principal: Option<&Principal>,
        requirement: &RouteRequirement,
    ) -> AccessDecision {
        let decision = decide_access(
            principal.map(|p| &p.identity),
            principal.and_then(|p| p.role),
            requirement,
            &self.config,
        );
        if let AccessDecision::RedirectTo(to) = &decision {
            tracing::debug!(path = %requirement.path, redirect = %to, "Route access denied");
        }
        decision
    }

    /// Start resolving in the background. The mount shows nothing but
    /// `GuardView::Resolving` until the decision is final.
    pub fn mount(&self, requirement: RouteRequirement) -> GuardMount {
        GuardMount::spawn(self.clone(), requirement)
    }
}
