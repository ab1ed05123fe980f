//! API integration tests
//!
//! Drives the composed router end to end against the in-memory backend:
//! sign-in, first-run setup, invitations, guarded page trees, attachments.

#![allow(dead_code)]

mod attachments;
mod auth;
mod common;
mod guards;
mod invitations;
