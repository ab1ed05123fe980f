//! API layer for the Messaging domain

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::MessagingState;
pub use routes::routes;
