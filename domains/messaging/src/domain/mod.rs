//! Messaging domain layer

pub mod attachments;
