//! Authorization roles
//!
//! Coachdesk has exactly one role enumeration. Older records spell the coach
//! role as `trainer`; both parsing and deserialization accept that spelling
//! and normalize it to [`Role::Coach`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authorization tier controlling which routes and features a principal may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(alias = "trainer")]
    Coach,
    Client,
}

impl Role {
    /// Every role, in privilege order
    pub const ALL: [Role; 3] = [Role::Admin, Role::Coach, Role::Client];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coach => "coach",
            Role::Client => "client",
        }
    }

    /// Whether a principal holding this role may invite someone into `target`.
    ///
    /// Admins provision coaches and clients, coaches provision their clients.
    /// Admin accounts are only created through first-run bootstrap.
    pub fn can_invite(&self, target: Role) -> bool {
        match self {
            Role::Admin => matches!(target, Role::Coach | Role::Client),
            Role::Coach => target == Role::Client,
            Role::Client => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role string is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "coach" | "trainer" => Ok(Role::Coach),
            "client" => Ok(Role::Client),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}
