//! API layer for the Onboarding domain
//!
//! Contains HTTP handlers, routes, and domain state definition.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::OnboardingState;
pub use routes::routes;
