//! Application lifecycle and visit scheduling engine for pet adoptions.
//!
//! The crate owns the adoption workflow: intake, the status state machine,
//! time-slot allocation for home and shelter visits, the reactivation
//! sub-workflow for expired applications, and the expiration sweeper. HTTP
//! transport, credential handling, and message delivery live behind thin
//! collaborator traits.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
