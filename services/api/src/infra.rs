use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Timelike};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use homeward::workflows::adoption::{
    AdoptionStore, Application, ApplicationFilter, ApplicationId, DispatchError, EmailMessage,
    EmailSender, Notification, NotificationPayload, Page, Pet, PushChannel, ReactivationRequest,
    RepositoryError, ShelterContact, Visit, VisitType,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreState {
    applications: HashMap<ApplicationId, Application>,
    visits: Vec<Visit>,
    pets: HashMap<(String, String), Pet>,
    shelters: HashMap<String, ShelterContact>,
    reactivations: HashMap<ApplicationId, ReactivationRequest>,
    notifications: Vec<Notification>,
}

/// Single-process store backing the service until a database lands.
#[derive(Default)]
pub(crate) struct InMemoryAdoptionStore {
    state: Mutex<StoreState>,
}

impl InMemoryAdoptionStore {
    pub(crate) fn seed_shelter(&self, shelter: ShelterContact) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.shelters.insert(shelter.shelter_id.clone(), shelter);
    }

    pub(crate) fn seed_pet(&self, pet: Pet) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state
            .pets
            .insert((pet.shelter_id.clone(), pet.microchip_id.clone()), pet);
    }
}

impl AdoptionStore for InMemoryAdoptionStore {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
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
                application.home_visit_deadline == Some(date) && !application.status.is_terminal()
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

/// Writes every outbound email to the log instead of an SMTP relay.
#[derive(Default)]
pub(crate) struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: EmailMessage) -> Result<(), DispatchError> {
        info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "outbound email"
        );
        Ok(())
    }
}

/// Writes push payloads to the log instead of a delivery gateway.
#[derive(Default)]
pub(crate) struct LogPushChannel;

impl PushChannel for LogPushChannel {
    fn emit_user_notification(
        &self,
        recipient: &str,
        payload: NotificationPayload,
    ) -> Result<(), DispatchError> {
        info!(
            recipient = %recipient,
            application = %payload.application_id.0,
            status = payload.status.label(),
            "push notification"
        );
        Ok(())
    }
}

/// Starter catalog so the service answers real requests out of the box.
pub(crate) fn seed_catalog(store: &InMemoryAdoptionStore) {
    store.seed_shelter(ShelterContact {
        shelter_id: "shl-001".to_string(),
        name: "Cedar Valley Shelter".to_string(),
        email: "team@cedarvalley.example".to_string(),
    });
    store.seed_pet(Pet {
        shelter_id: "shl-001".to_string(),
        microchip_id: "chip-9001".to_string(),
        name: "Biscuit".to_string(),
        image_url: Some("https://cdn.cedarvalley.example/pets/biscuit.jpg".to_string()),
        is_adopted: false,
    });
    store.seed_pet(Pet {
        shelter_id: "shl-001".to_string(),
        microchip_id: "chip-9002".to_string(),
        name: "Clover".to_string(),
        image_url: None,
        is_adopted: false,
    });
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
