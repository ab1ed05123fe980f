//! HTTP handlers for the Messaging domain

pub mod attachments;
