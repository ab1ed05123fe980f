//! Shared types and configuration for Coachdesk
//!
//! This crate provides functionality used by every other Coachdesk crate:
//! - The single authoritative `Role` enumeration
//! - State machine error types
//! - Runtime configuration following 12-factor principles

pub mod config;
pub mod role;
pub mod state;

pub use config::Config;
pub use role::{ParseRoleError, Role};
pub use state::StateError;
