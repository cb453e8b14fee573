//! Adoption application lifecycle: intake, visit scheduling, the multi-stage
//! review state machine, reactivation of expired applications, and the
//! expiration sweeper.
//!
//! The service module is the single writer of application status; routing,
//! credential checks, and message delivery sit behind collaborator traits.

pub mod domain;
pub mod messaging;
pub mod repository;
pub mod router;
pub mod scheduling;
pub mod service;
pub mod sweeper;
pub mod transitions;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationIntake, ApplicationStatus,
    Notification, Pet, ReactivationRequest, ShelterContact, StatusChange, Visit, VisitType,
};
pub use messaging::{
    DispatchError, EmailMessage, EmailSender, NotificationPayload, PushChannel,
};
pub use repository::{AdoptionStore, ApplicationFilter, Page, RepositoryError};
pub use router::adoption_router;
pub use scheduling::DAILY_SLOTS;
pub use service::{AdoptionService, AdoptionServiceError};
pub use sweeper::ExpirationSweeper;
pub use transitions::TransitionPolicy;
