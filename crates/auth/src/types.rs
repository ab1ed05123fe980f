//! Auth read-model types
//!
//! Lightweight views over what the identity provider and role directory
//! return. These carry only the fields needed for gating and display.

use coachdesk_backend::RemoteUser;
use coachdesk_common::Role;
use serde::Serialize;
use uuid::Uuid;

/// Authenticated identity as established by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<RemoteUser> for Identity {
    fn from(user: RemoteUser) -> Self {
        let full_name = user
            .user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from);

        Self {
            id: user.id,
            email: user.email,
            full_name,
        }
    }
}

/// Identity plus its resolved role. `role` is `None` when the directory holds
/// no role row for the identity or the lookup failed closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    #[serde(flatten)]
    pub identity: Identity,
    pub role: Option<Role>,
}

impl Principal {
    pub fn flags(&self) -> RoleFlags {
        RoleFlags::from(self.role)
    }

    pub fn has_role(&self, allowed: &[Role]) -> bool {
        self.role.is_some_and(|role| allowed.contains(&role))
    }
}

/// Convenience booleans derived from a resolved role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_coach: bool,
    pub is_client: bool,
}

impl From<Option<Role>> for RoleFlags {
    fn from(role: Option<Role>) -> Self {
        Self {
            is_admin: role == Some(Role::Admin),
            is_coach: role == Some(Role::Coach),
            is_client: role == Some(Role::Client),
        }
    }
}
