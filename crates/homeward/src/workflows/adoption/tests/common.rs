use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};

use crate::config::SchedulingConfig;
use crate::workflows::adoption::domain::{
    Application, ApplicationId, ApplicationIntake, ApplicationStatus, Notification, Pet,
    ReactivationRequest, ShelterContact, Visit, VisitType,
};
use crate::workflows::adoption::messaging::{
    DispatchError, EmailMessage, EmailSender, NotificationPayload, PushChannel,
};
use crate::workflows::adoption::repository::{
    AdoptionStore, ApplicationFilter, Page, RepositoryError,
};
use crate::workflows::adoption::service::AdoptionService;

pub(super) const SHELTER_ID: &str = "shl-001";
pub(super) const MICROCHIP_ID: &str = "chip-9001";
pub(super) const APPLICANT: &str = "casey@example.com";
pub(super) const RIVAL: &str = "rowan@example.com";

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 28, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn today() -> NaiveDate {
    fixed_now().date_naive()
}

pub(super) fn visit_at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).expect("valid time"))
}

pub(super) fn shelter() -> ShelterContact {
    ShelterContact {
        shelter_id: SHELTER_ID.to_string(),
        name: "Cedar Valley Shelter".to_string(),
        email: "team@cedarvalley.example".to_string(),
    }
}

pub(super) fn pet() -> Pet {
    Pet {
        shelter_id: SHELTER_ID.to_string(),
        microchip_id: MICROCHIP_ID.to_string(),
        name: "Biscuit".to_string(),
        image_url: Some("https://cdn.example/pets/biscuit.jpg".to_string()),
        is_adopted: false,
    }
}

pub(super) fn intake(applicant_email: &str) -> ApplicationIntake {
    ApplicationIntake {
        shelter_id: SHELTER_ID.to_string(),
        microchip_id: MICROCHIP_ID.to_string(),
        applicant_email: applicant_email.to_string(),
    }
}

pub(super) type TestService = AdoptionService<MemoryStore, MemoryMailer, MemoryPush>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryStore>,
    Arc<MemoryMailer>,
    Arc<MemoryPush>,
) {
    let store = Arc::new(MemoryStore::default());
    store.seed_shelter(shelter());
    store.seed_pet(pet());
    let mailer = Arc::new(MemoryMailer::default());
    let push = Arc::new(MemoryPush::default());
    let service = AdoptionService::new(
        store.clone(),
        mailer.clone(),
        push.clone(),
        SchedulingConfig::default(),
    );
    (service, store, mailer, push)
}

/// Drops an application into an arbitrary lifecycle state without driving
/// the whole flow first.
pub(super) fn force_status(store: &MemoryStore, id: &ApplicationId, status: ApplicationStatus) {
    let mut application = store
        .fetch_application(id)
        .expect("fetch succeeds")
        .expect("application present");
    application.status = status;
    store
        .update_application(application)
        .expect("update succeeds");
}

#[derive(Default)]
struct MemoryState {
    applications: HashMap<ApplicationId, Application>,
    visits: Vec<Visit>,
    pets: HashMap<(String, String), Pet>,
    shelters: HashMap<String, ShelterContact>,
    reactivations: HashMap<ApplicationId, ReactivationRequest>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub(super) struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub(super) fn seed_shelter(&self, shelter: ShelterContact) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.shelters.insert(shelter.shelter_id.clone(), shelter);
    }

    pub(super) fn seed_pet(&self, pet: Pet) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
            .pets
            .insert((pet.shelter_id.clone(), pet.microchip_id.clone()), pet);
    }

    pub(super) fn notifications(&self) -> Vec<Notification> {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .notifications
            .clone()
    }

    pub(super) fn visits(&self) -> Vec<Visit> {
        self.state
            .lock()
            .expect("store mutex poisoned")
            .visits
            .clone()
    }
}

impl AdoptionStore for MemoryStore {
    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if !state.applications.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }
        state.applications.insert(application.id.clone(), application);
        Ok(())
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.applications.get(id).cloned())
    }

    fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> Result<Vec<Application>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut matching: Vec<Application> = state
            .applications
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }

    fn live_applications_for_pet(
        &self,
        shelter_id: &str,
        microchip_id: &str,
    ) -> Result<Vec<Application>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .values()
            .filter(|application| {
                application.shelter_id == shelter_id
                    && application.microchip_id == microchip_id
                    && !application.status.is_terminal()
            })
            .cloned()
            .collect())
    }

    fn applications_expiring_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Application>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .applications
            .values()
            .filter(|application| {
                application.home_visit_deadline == Some(date)
                    && !application.status.is_terminal()
            })
            .cloned()
            .collect())
    }

    fn book_visit(&self, visit: Visit) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let taken = state.visits.iter().any(|existing| {
            existing.shelter_id == visit.shelter_id
                && existing.visit_type == visit.visit_type
                && existing.visit_at.date_naive() == visit.visit_at.date_naive()
                && existing.visit_at.hour() == visit.visit_at.hour()
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        state.visits.push(visit);
        Ok(())
    }

    fn booked_hours(
        &self,
        shelter_id: &str,
        visit_type: VisitType,
        date: NaiveDate,
    ) -> Result<Vec<u32>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .visits
            .iter()
            .filter(|visit| {
                visit.shelter_id == shelter_id
                    && visit.visit_type == visit_type
                    && visit.visit_at.date_naive() == date
            })
            .map(|visit| visit.visit_at.hour())
            .collect())
    }

    fn fetch_pet(
        &self,
        shelter_id: &str,
        microchip_id: &str,
    ) -> Result<Option<Pet>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .pets
            .get(&(shelter_id.to_string(), microchip_id.to_string()))
            .cloned())
    }

    fn mark_pet_adopted(
        &self,
        shelter_id: &str,
        microchip_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let pet = state
            .pets
            .get_mut(&(shelter_id.to_string(), microchip_id.to_string()))
            .ok_or(RepositoryError::NotFound)?;
        pet.is_adopted = true;
        Ok(())
    }

    fn fetch_shelter(&self, shelter_id: &str) -> Result<Option<ShelterContact>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.shelters.get(shelter_id).cloned())
    }

    fn insert_reactivation(&self, request: ReactivationRequest) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.reactivations.contains_key(&request.application_id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .reactivations
            .insert(request.application_id.clone(), request);
        Ok(())
    }

    fn fetch_reactivation(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ReactivationRequest>, RepositoryError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.reactivations.get(id).cloned())
    }

    fn append_notification(&self, notification: Notification) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.notifications.push(notification);
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MemoryMailer {
    pub(super) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

impl EmailSender for MemoryMailer {
    fn send(&self, message: EmailMessage) -> Result<(), DispatchError> {
        self.sent.lock().expect("mailer mutex poisoned").push(message);
        Ok(())
    }
}

/// Mailer whose transport is always down, for the swallow-and-log rule.
pub(super) struct BrokenMailer;

impl EmailSender for BrokenMailer {
    fn send(&self, _message: EmailMessage) -> Result<(), DispatchError> {
        Err(DispatchError::Email("smtp offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryPush {
    events: Mutex<Vec<(String, NotificationPayload)>>,
}

impl MemoryPush {
    pub(super) fn events(&self) -> Vec<(String, NotificationPayload)> {
        self.events.lock().expect("push mutex poisoned").clone()
    }
}

impl PushChannel for MemoryPush {
    fn emit_user_notification(
        &self,
        recipient: &str,
        payload: NotificationPayload,
    ) -> Result<(), DispatchError> {
        self.events
            .lock()
            .expect("push mutex poisoned")
            .push((recipient.to_string(), payload));
        Ok(())
    }
}
