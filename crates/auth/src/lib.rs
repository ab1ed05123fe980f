//! Authentication and authorization for Coachdesk
//!
//! Sequences session resolution, role lookup, and route gating so that a
//! protected view is never reached before authorization settles:
//! - `SessionStore`: lifecycle-scoped identity cache over the identity provider
//! - `RoleResolver`: authoritative role lookup keyed to the session generation
//! - `decide_access` / `RouteGuard`: pure access decision plus its async driver
//! - axum extractors and the `enforce_route` middleware

mod backend;
mod config;
mod error;
mod extractors;
mod guard;
mod middleware;
mod mount;
mod roles;
mod session;
mod types;
mod validation;

pub use backend::AuthBackend;
pub use config::{AuthConfig, SESSION_COOKIE};
pub use error::{remote_call, AuthError};
pub use extractors::{access_token_from_headers, AuthUser, CurrentSession};
pub use guard::{decide_access, AccessDecision, RouteGuard, RouteRequirement};
pub use middleware::{enforce_route, GuardState};
pub use mount::{GuardMount, GuardView};
pub use roles::{RoleOutcome, RoleResolver};
pub use session::{AuthEvent, SessionSnapshot, SessionStore};
pub use types::{Identity, Principal, RoleFlags};
pub use validation::{
    validate_email_address, validate_password, Credentials, MAX_EMAIL_LENGTH,
    MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
