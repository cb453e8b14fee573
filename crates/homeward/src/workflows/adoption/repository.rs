use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Notification, Pet, ReactivationRequest,
    ShelterContact, Visit, VisitType,
};

/// Error enumeration for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Filters accepted by the application listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFilter {
    pub shelter_id: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub applicant_email: Option<String>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        self.shelter_id
            .as_deref()
            .is_none_or(|id| id == application.shelter_id)
            && self.status.is_none_or(|status| status == application.status)
            && self
                .applicant_email
                .as_deref()
                .is_none_or(|email| email == application.applicant_email)
    }
}

/// Offset/limit pagination for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

/// Persistence seam for the adoption workflow so the service module can be
/// exercised against in-memory fakes.
///
/// `book_visit` is the commit-time guard for the slot race: implementations
/// must enforce uniqueness on (shelter, visit type, date, hour slot) and
/// answer `Conflict` for the losing writer.
pub trait AdoptionStore: Send + Sync {
    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> Result<Vec<Application>, RepositoryError>;
    /// Non-terminal applications for one pet, the fan-out closure's input.
    fn live_applications_for_pet(
        &self,
        shelter_id: &str,
        microchip_id: &str,
    ) -> Result<Vec<Application>, RepositoryError>;
    /// Non-terminal applications whose home-visit deadline falls on `date`.
    fn applications_expiring_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Application>, RepositoryError>;

    fn book_visit(&self, visit: Visit) -> Result<(), RepositoryError>;
    fn booked_hours(
        &self,
        shelter_id: &str,
        visit_type: VisitType,
        date: NaiveDate,
    ) -> Result<Vec<u32>, RepositoryError>;

    fn fetch_pet(&self, shelter_id: &str, microchip_id: &str)
        -> Result<Option<Pet>, RepositoryError>;
    fn mark_pet_adopted(&self, shelter_id: &str, microchip_id: &str)
        -> Result<(), RepositoryError>;

    fn fetch_shelter(&self, shelter_id: &str) -> Result<Option<ShelterContact>, RepositoryError>;

    fn insert_reactivation(&self, request: ReactivationRequest) -> Result<(), RepositoryError>;
    fn fetch_reactivation(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ReactivationRequest>, RepositoryError>;

    fn append_notification(&self, notification: Notification) -> Result<(), RepositoryError>;
}
