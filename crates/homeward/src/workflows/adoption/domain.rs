use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for adoption applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Who is acting on a request, as supplied by the upstream identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn applicant(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: ActorRole::Applicant,
        }
    }

    pub fn shelter(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: ActorRole::Shelter,
        }
    }

    /// Internal actor used by the expiration sweeper.
    pub fn system() -> Self {
        Self {
            email: "sweeper@homeward.internal".to_string(),
            role: ActorRole::System,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Applicant,
    Shelter,
    System,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Applicant => "applicant",
            Self::Shelter => "shelter",
            Self::System => "system",
        }
    }

    /// Parses roles accepted at the HTTP edge. `System` is deliberately not
    /// parseable; it is reserved for in-process callers.
    pub fn parse_external(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "applicant" => Some(Self::Applicant),
            "shelter" => Some(Self::Shelter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    Home,
    Shelter,
}

impl VisitType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Shelter => "shelter",
        }
    }
}

/// Stored lifecycle status of an adoption application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    UnderReview,
    HomeVisitRequested,
    HomeVisitScheduled,
    HomeApproved,
    HomeRejected,
    UserVisitScheduled,
    Approved,
    Rejected,
    ReactivationRequested,
    Closed,
    Expired,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnderReview => "Under Review",
            Self::HomeVisitRequested => "Home Visit Requested",
            Self::HomeVisitScheduled => "Home Visit Scheduled",
            Self::HomeApproved => "Home Approved",
            Self::HomeRejected => "Home Rejected",
            Self::UserVisitScheduled => "User Visit Scheduled",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::ReactivationRequested => "Reactivation Requested",
            Self::Closed => "Closed",
            Self::Expired => "Expired",
        }
    }

    /// Terminal for the normal flow. `Expired` can still escape through the
    /// reactivation sub-workflow.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Closed | Self::Expired
        )
    }
}

/// A transition requested through the state machine. Most changes name the
/// status they produce; the two reactivation decisions resolve to the status
/// the application re-enters or ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChange {
    HomeVisitRequested,
    HomeApproved,
    HomeRejected,
    Approved,
    Rejected,
    ReactivationRequestApproved,
    ReactivationRequestDeclined,
    Expired,
}

impl StatusChange {
    pub const fn resolved(self) -> ApplicationStatus {
        match self {
            Self::HomeVisitRequested => ApplicationStatus::HomeVisitRequested,
            Self::HomeApproved => ApplicationStatus::HomeApproved,
            Self::HomeRejected => ApplicationStatus::HomeRejected,
            Self::Approved => ApplicationStatus::Approved,
            Self::Rejected => ApplicationStatus::Rejected,
            Self::ReactivationRequestApproved => ApplicationStatus::HomeVisitRequested,
            Self::ReactivationRequestDeclined => ApplicationStatus::Closed,
            Self::Expired => ApplicationStatus::Expired,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::HomeVisitRequested => "home_visit_requested",
            Self::HomeApproved => "home_approved",
            Self::HomeRejected => "home_rejected",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ReactivationRequestApproved => "reactivation_request_approved",
            Self::ReactivationRequestDeclined => "reactivation_request_declined",
            Self::Expired => "expired",
        }
    }
}

/// One applicant's request to adopt one pet from one shelter. Aggregate root
/// of the workflow; rows are never physically deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub shelter_id: String,
    pub microchip_id: String,
    pub applicant_email: String,
    pub status: ApplicationStatus,
    pub home_visit_at: Option<DateTime<Utc>>,
    pub shelter_visit_at: Option<DateTime<Utc>>,
    pub home_visit_email_sent_at: Option<DateTime<Utc>>,
    pub shelter_visit_email_sent_at: Option<DateTime<Utc>>,
    /// Last day the applicant may book a home visit; the sweeper expires the
    /// application once this date arrives unbooked.
    pub home_visit_deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Intake payload for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationIntake {
    pub shelter_id: String,
    pub microchip_id: String,
    pub applicant_email: String,
}

/// A booked appointment. Append-only; never mutated by normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub application_id: ApplicationId,
    pub shelter_id: String,
    pub microchip_id: String,
    pub applicant_email: String,
    pub visit_at: DateTime<Utc>,
    pub visit_type: VisitType,
}

/// Satellite record tied 1:1 to an expired application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactivationRequest {
    pub application_id: ApplicationId,
    pub reason_not_scheduled: String,
    pub reason_to_reactivate: String,
    pub created_at: DateTime<Utc>,
}

/// Adoptable pet identity plus the one flag this workflow mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub shelter_id: String,
    pub microchip_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub is_adopted: bool,
}

/// Contact sheet for the shelter side of outcome and confirmation emails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelterContact {
    pub shelter_id: String,
    pub name: String,
    pub email: String,
}

/// Durable projection of a status change, surfaced to the applicant's inbox.
/// Read/seen flags are flipped by endpoints outside this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub is_read: bool,
    pub is_seen: bool,
    pub created_at: DateTime<Utc>,
}
