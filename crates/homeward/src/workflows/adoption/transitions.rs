use std::collections::BTreeMap;

use super::domain::{ActorRole, ApplicationStatus, StatusChange};

/// Immutable role → permitted-changes table, injected at construction and
/// never mutated at runtime.
#[derive(Debug, Clone)]
pub struct TransitionPolicy {
    allowed: BTreeMap<ActorRole, Vec<StatusChange>>,
}

impl TransitionPolicy {
    /// The production permission table: shelters drive review outcomes and
    /// reactivation decisions, the system actor drives expiration. Applicants
    /// act through the scheduling and reactivation-request operations, not
    /// through direct status changes.
    pub fn standard() -> Self {
        let mut allowed = BTreeMap::new();
        allowed.insert(
            ActorRole::Shelter,
            vec![
                StatusChange::HomeVisitRequested,
                StatusChange::HomeApproved,
                StatusChange::HomeRejected,
                StatusChange::Approved,
                StatusChange::Rejected,
                StatusChange::ReactivationRequestApproved,
                StatusChange::ReactivationRequestDeclined,
            ],
        );
        allowed.insert(ActorRole::System, vec![StatusChange::Expired]);
        allowed.insert(ActorRole::Applicant, Vec::new());
        Self { allowed }
    }

    pub fn allows(&self, role: ActorRole, change: StatusChange) -> bool {
        self.allowed
            .get(&role)
            .is_some_and(|changes| changes.contains(&change))
    }
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Whether `change` may fire while the application sits in `from`.
pub fn reachable(from: ApplicationStatus, change: StatusChange) -> bool {
    match change {
        StatusChange::HomeVisitRequested => from == ApplicationStatus::UnderReview,
        StatusChange::HomeApproved | StatusChange::HomeRejected => {
            from == ApplicationStatus::HomeVisitScheduled
        }
        StatusChange::Approved | StatusChange::Rejected => {
            from == ApplicationStatus::UserVisitScheduled
        }
        StatusChange::ReactivationRequestApproved | StatusChange::ReactivationRequestDeclined => {
            from == ApplicationStatus::ReactivationRequested
        }
        StatusChange::Expired => !from.is_terminal(),
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("role {role} may not request the {change} change", role = .role.label(), change = .change.label())]
    Forbidden { role: ActorRole, change: StatusChange },
    #[error("cannot apply {change} while the application is {from}", change = .change.label(), from = .from.label())]
    Unreachable {
        from: ApplicationStatus,
        change: StatusChange,
    },
}

/// Validates authorization and reachability, returning the stored status the
/// application moves to. Rejected transitions leave the caller's snapshot
/// untouched.
pub fn validate(
    policy: &TransitionPolicy,
    from: ApplicationStatus,
    change: StatusChange,
    role: ActorRole,
) -> Result<ApplicationStatus, TransitionError> {
    if !policy.allows(role, change) {
        return Err(TransitionError::Forbidden { role, change });
    }
    if !reachable(from, change) {
        return Err(TransitionError::Unreachable { from, change });
    }
    Ok(change.resolved())
}
