//! Onboarding domain layer: entities, state machine, validator, flow controller

pub mod bootstrap;
pub mod entities;
pub mod flow;
pub mod invitations;
pub mod state;
