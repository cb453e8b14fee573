use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::config::SchedulingConfig;

use super::domain::{
    Actor, ActorRole, Application, ApplicationId, ApplicationIntake, ApplicationStatus,
    Notification, ReactivationRequest, ShelterContact, StatusChange, Visit, VisitType,
};
use super::messaging::{self, Dispatcher, EmailMessage, EmailSender, NotificationPayload, PushChannel};
use super::repository::{AdoptionStore, ApplicationFilter, Page, RepositoryError};
use super::scheduling;
use super::transitions::{self, TransitionError, TransitionPolicy};

/// Service composing the store, the transition policy, and the message
/// dispatcher. The single writer of `Application.status`.
pub struct AdoptionService<S, E, P> {
    store: Arc<S>,
    dispatcher: Dispatcher<E, P>,
    policy: TransitionPolicy,
    scheduling: SchedulingConfig,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static NOTIFICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("apl-{id:06}"))
}

fn next_notification_id() -> String {
    let id = NOTIFICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("ntf-{id:06}")
}

/// Error raised by the adoption service; variants mirror the workflow's
/// business-rule taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum AdoptionServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidDate(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<TransitionError> for AdoptionServiceError {
    fn from(value: TransitionError) -> Self {
        match value {
            err @ TransitionError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            err @ TransitionError::Unreachable { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl<S, E, P> AdoptionService<S, E, P>
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    pub fn new(store: Arc<S>, email: Arc<E>, push: Arc<P>, scheduling: SchedulingConfig) -> Self {
        Self {
            store,
            dispatcher: Dispatcher::new(email, push),
            policy: TransitionPolicy::standard(),
            scheduling,
        }
    }

    /// Intake a new application for one pet, starting at `UnderReview`.
    pub fn create_application(
        &self,
        intake: ApplicationIntake,
    ) -> Result<Application, AdoptionServiceError> {
        self.create_application_at(intake, Utc::now())
    }

    pub fn create_application_at(
        &self,
        intake: ApplicationIntake,
        now: DateTime<Utc>,
    ) -> Result<Application, AdoptionServiceError> {
        let pet = self
            .store
            .fetch_pet(&intake.shelter_id, &intake.microchip_id)?
            .ok_or(AdoptionServiceError::NotFound("pet"))?;
        if pet.is_adopted {
            return Err(AdoptionServiceError::Conflict(
                "pet has already been adopted".to_string(),
            ));
        }

        let live = self
            .store
            .live_applications_for_pet(&intake.shelter_id, &intake.microchip_id)?;
        if live
            .iter()
            .any(|existing| existing.applicant_email == intake.applicant_email)
        {
            return Err(AdoptionServiceError::Conflict(
                "an application for this pet is already open".to_string(),
            ));
        }

        let application = Application {
            id: next_application_id(),
            shelter_id: intake.shelter_id,
            microchip_id: intake.microchip_id,
            applicant_email: intake.applicant_email,
            status: ApplicationStatus::UnderReview,
            home_visit_at: None,
            shelter_visit_at: None,
            home_visit_email_sent_at: None,
            shelter_visit_email_sent_at: None,
            home_visit_deadline: None,
            created_at: now,
        };
        let stored = self.store.insert_application(application)?;
        Ok(stored)
    }

    pub fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> Result<Vec<Application>, AdoptionServiceError> {
        Ok(self.store.list_applications(filter, page)?)
    }

    pub fn get_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Application, AdoptionServiceError> {
        self.store
            .fetch_application(id)?
            .ok_or(AdoptionServiceError::NotFound("application"))
    }

    /// Drive the state machine: validate, mutate, then run the transition's
    /// side effects. Every success appends exactly one durable notification
    /// for the primary applicant.
    pub fn update_status(
        &self,
        id: &ApplicationId,
        change: StatusChange,
        actor: &Actor,
    ) -> Result<Application, AdoptionServiceError> {
        self.update_status_at(id, change, actor, Utc::now())
    }

    pub fn update_status_at(
        &self,
        id: &ApplicationId,
        change: StatusChange,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Application, AdoptionServiceError> {
        let mut application = self.get_application(id)?;
        let next = transitions::validate(&self.policy, application.status, change, actor.role)?;

        application.status = next;
        if next == ApplicationStatus::HomeVisitRequested {
            application.home_visit_deadline =
                Some(now.date_naive() + Duration::days(self.scheduling.home_visit_deadline_days));
        }
        self.store.update_application(application.clone())?;

        info!(
            application = %application.id.0,
            change = change.label(),
            status = application.status.label(),
            "status transition applied"
        );

        if next == ApplicationStatus::Approved {
            self.finalize_adoption(&application);
        }

        let emails = self.transition_emails(&application, next, now);
        self.announce(&application, emails, now);
        Ok(application)
    }

    /// Email set for a just-applied transition, per the fixed status → effect
    /// table. Expiration is sweeper-driven and sends nothing.
    fn transition_emails(
        &self,
        application: &Application,
        status: ApplicationStatus,
        now: DateTime<Utc>,
    ) -> Vec<EmailMessage> {
        let mut emails = Vec::new();
        match status {
            ApplicationStatus::HomeVisitRequested => {
                let deadline = application
                    .home_visit_deadline
                    .unwrap_or_else(|| now.date_naive());
                emails.push(messaging::home_visit_request_email(application, deadline));
            }
            ApplicationStatus::HomeApproved => {
                emails.push(messaging::home_visit_outcome_email(application, true, now));
            }
            ApplicationStatus::HomeRejected => {
                emails.push(messaging::home_visit_outcome_email(application, false, now));
            }
            ApplicationStatus::Approved => {
                let pet = self.lookup_pet(application);
                emails.push(messaging::adoption_confirmed_applicant_email(
                    application,
                    pet.as_ref(),
                ));
                if let Some(shelter) = self.lookup_shelter(application) {
                    emails.push(messaging::adoption_confirmed_shelter_email(
                        application,
                        &shelter,
                    ));
                }
            }
            ApplicationStatus::Rejected => {
                emails.push(messaging::rejection_applicant_email(application));
                if let Some(shelter) = self.lookup_shelter(application) {
                    emails.push(messaging::rejection_shelter_email(application, &shelter));
                }
            }
            ApplicationStatus::Closed => {
                emails.push(messaging::reactivation_declined_email(application));
            }
            ApplicationStatus::Expired => {}
            _ => {}
        }
        emails
    }

    /// Approval fan-out: flip the pet's adopted flag and close every other
    /// live application for the same pet. Best-effort by contract; the
    /// primary approval has already committed, so failures here are logged
    /// for follow-up rather than surfaced.
    fn finalize_adoption(&self, application: &Application) {
        if let Err(err) = self
            .store
            .mark_pet_adopted(&application.shelter_id, &application.microchip_id)
        {
            warn!(
                application = %application.id.0,
                error = %err,
                "failed to mark pet adopted"
            );
        }

        let siblings = match self
            .store
            .live_applications_for_pet(&application.shelter_id, &application.microchip_id)
        {
            Ok(siblings) => siblings,
            Err(err) => {
                warn!(
                    application = %application.id.0,
                    error = %err,
                    "failed to load competing applications for closure"
                );
                return;
            }
        };

        for mut sibling in siblings {
            if sibling.id == application.id {
                continue;
            }
            sibling.status = ApplicationStatus::Closed;
            if let Err(err) = self.store.update_application(sibling.clone()) {
                warn!(
                    application = %sibling.id.0,
                    error = %err,
                    "failed to close competing application"
                );
                continue;
            }
            // Closed-out applicants are emailed but get no push notification.
            self.dispatcher
                .send_email(messaging::pet_already_adopted_email(&sibling));
        }
    }

    /// Bookable slot labels for one shelter/pet/date, ascending.
    pub fn available_slots(
        &self,
        shelter_id: &str,
        microchip_id: &str,
        date: NaiveDate,
        visit_type: VisitType,
    ) -> Result<Vec<&'static str>, AdoptionServiceError> {
        self.available_slots_on(shelter_id, microchip_id, date, visit_type, Utc::now().date_naive())
    }

    pub fn available_slots_on(
        &self,
        shelter_id: &str,
        microchip_id: &str,
        date: NaiveDate,
        visit_type: VisitType,
        today: NaiveDate,
    ) -> Result<Vec<&'static str>, AdoptionServiceError> {
        self.store
            .fetch_shelter(shelter_id)?
            .ok_or(AdoptionServiceError::NotFound("shelter"))?;
        self.store
            .fetch_pet(shelter_id, microchip_id)?
            .ok_or(AdoptionServiceError::NotFound("pet"))?;
        scheduling::validate_visit_date(date, today, self.scheduling.booking_window_days)
            .map_err(|err| AdoptionServiceError::InvalidDate(err.to_string()))?;

        let booked = self.store.booked_hours(shelter_id, visit_type, date)?;
        Ok(scheduling::open_slots(&booked))
    }

    /// Book a visit slot and advance the application. Home visits belong to
    /// the applicant and fire from `HomeVisitRequested`; shelter visits
    /// belong to the shelter and fire from `HomeApproved`.
    pub fn schedule_visit(
        &self,
        id: &ApplicationId,
        visit_at: DateTime<Utc>,
        visit_type: VisitType,
        actor: &Actor,
    ) -> Result<Application, AdoptionServiceError> {
        self.schedule_visit_at(id, visit_at, visit_type, actor, Utc::now())
    }

    pub fn schedule_visit_at(
        &self,
        id: &ApplicationId,
        visit_at: DateTime<Utc>,
        visit_type: VisitType,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Application, AdoptionServiceError> {
        let mut application = self.get_application(id)?;

        match visit_type {
            VisitType::Home => {
                if actor.role != ActorRole::Applicant
                    || actor.email != application.applicant_email
                {
                    return Err(AdoptionServiceError::Forbidden(
                        "home visits are booked by the applicant on the application".to_string(),
                    ));
                }
            }
            VisitType::Shelter => {
                if actor.role != ActorRole::Shelter {
                    return Err(AdoptionServiceError::Forbidden(
                        "shelter visits are booked by the shelter".to_string(),
                    ));
                }
            }
        }

        let next = match (visit_type, application.status) {
            (VisitType::Home, ApplicationStatus::HomeVisitRequested) => {
                ApplicationStatus::HomeVisitScheduled
            }
            (VisitType::Shelter, ApplicationStatus::HomeApproved) => {
                ApplicationStatus::UserVisitScheduled
            }
            (kind, status) => {
                return Err(AdoptionServiceError::Conflict(format!(
                    "a {} visit cannot be booked while the application is {}",
                    kind.label(),
                    status.label(),
                )));
            }
        };

        let shelter = self
            .store
            .fetch_shelter(&application.shelter_id)?
            .ok_or(AdoptionServiceError::NotFound("shelter"))?;

        scheduling::validate_visit_timestamp(
            visit_at,
            now,
            self.scheduling.booking_window_days,
            self.scheduling.past_tolerance_minutes,
        )
        .map_err(|err| AdoptionServiceError::InvalidDate(err.to_string()))?;

        // Commit-time re-check: the store's uniqueness rule settles the race
        // for the last free slot.
        self.store
            .book_visit(Visit {
                application_id: application.id.clone(),
                shelter_id: application.shelter_id.clone(),
                microchip_id: application.microchip_id.clone(),
                applicant_email: application.applicant_email.clone(),
                visit_at,
                visit_type,
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => AdoptionServiceError::Conflict(
                    "that time slot is no longer available".to_string(),
                ),
                other => AdoptionServiceError::Repository(other),
            })?;

        application.status = next;
        match visit_type {
            VisitType::Home => {
                application.home_visit_at = Some(visit_at);
                application.home_visit_email_sent_at = Some(now);
            }
            VisitType::Shelter => {
                application.shelter_visit_at = Some(visit_at);
                application.shelter_visit_email_sent_at = Some(now);
            }
        }
        self.store.update_application(application.clone())?;

        let (to_applicant, to_shelter) =
            messaging::visit_confirmation_emails(&application, &shelter, visit_at, visit_type);
        self.dispatcher.send_email(to_applicant);
        self.dispatcher.send_email(to_shelter);

        Ok(application)
    }

    /// Applicant asks to reopen an expired application.
    pub fn request_reactivation(
        &self,
        id: &ApplicationId,
        reason_not_scheduled: String,
        reason_to_reactivate: String,
        actor: &Actor,
    ) -> Result<ReactivationRequest, AdoptionServiceError> {
        self.request_reactivation_at(id, reason_not_scheduled, reason_to_reactivate, actor, Utc::now())
    }

    pub fn request_reactivation_at(
        &self,
        id: &ApplicationId,
        reason_not_scheduled: String,
        reason_to_reactivate: String,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<ReactivationRequest, AdoptionServiceError> {
        let mut application = self.get_application(id)?;
        if actor.role != ActorRole::Applicant || actor.email != application.applicant_email {
            return Err(AdoptionServiceError::Forbidden(
                "only the applicant on the application may request reactivation".to_string(),
            ));
        }
        if application.status != ApplicationStatus::Expired {
            return Err(AdoptionServiceError::Conflict(format!(
                "only expired applications can be reactivated, this one is {}",
                application.status.label(),
            )));
        }

        let request = ReactivationRequest {
            application_id: application.id.clone(),
            reason_not_scheduled,
            reason_to_reactivate,
            created_at: now,
        };
        self.store
            .insert_reactivation(request.clone())
            .map_err(|err| match err {
                RepositoryError::Conflict => AdoptionServiceError::Conflict(
                    "a reactivation request is already on file".to_string(),
                ),
                other => AdoptionServiceError::Repository(other),
            })?;

        application.status = ApplicationStatus::ReactivationRequested;
        self.store.update_application(application.clone())?;

        let mut emails = Vec::new();
        if let Some(shelter) = self.lookup_shelter(&application) {
            emails.push(messaging::reactivation_requested_email(
                &application,
                &shelter,
                &request.reason_not_scheduled,
                &request.reason_to_reactivate,
            ));
        }
        self.announce(&application, emails, now);

        Ok(request)
    }

    pub fn get_reactivation_request(
        &self,
        id: &ApplicationId,
    ) -> Result<ReactivationRequest, AdoptionServiceError> {
        self.store
            .fetch_reactivation(id)?
            .ok_or(AdoptionServiceError::NotFound("reactivation request"))
    }

    /// Sweeper entry point: expire every application whose home-visit
    /// deadline falls on `today` and which is still waiting on a booking.
    /// Safe to run twice for the same day.
    pub fn expire_due(&self, today: NaiveDate) -> Result<usize, AdoptionServiceError> {
        let due = self.store.applications_expiring_on(today)?;
        let actor = Actor::system();
        let mut expired = 0;
        for application in due {
            if application.status != ApplicationStatus::HomeVisitRequested {
                continue;
            }
            match self.update_status(&application.id, StatusChange::Expired, &actor) {
                Ok(_) => expired += 1,
                // Lost a race with a concurrent transition; nothing to do.
                Err(AdoptionServiceError::Conflict(_)) => {}
                Err(err) => {
                    warn!(
                        application = %application.id.0,
                        error = %err,
                        "expiration sweep failed for application"
                    );
                }
            }
        }
        Ok(expired)
    }

    /// Records the durable notification and pushes the live payload for a
    /// committed transition, then delivers the transition's emails. All
    /// best-effort: delivery failures never unwind the mutation.
    fn announce(&self, application: &Application, emails: Vec<EmailMessage>, now: DateTime<Utc>) {
        for email in emails {
            self.dispatcher.send_email(email);
        }

        let notification = Notification {
            id: next_notification_id(),
            recipient: application.applicant_email.clone(),
            application_id: application.id.clone(),
            status: application.status,
            is_read: false,
            is_seen: false,
            created_at: now,
        };
        if let Err(err) = self.store.append_notification(notification) {
            warn!(
                application = %application.id.0,
                error = %err,
                "failed to append notification"
            );
        }

        if application.status != ApplicationStatus::Expired {
            let pet = self.lookup_pet(application);
            let payload = NotificationPayload {
                application_id: application.id.clone(),
                status: application.status,
                message: messaging::status_headline(application.status),
                pet_name: pet.as_ref().map(|p| p.name.clone()),
                pet_image: pet.as_ref().and_then(|p| p.image_url.clone()),
            };
            self.dispatcher.push(&application.applicant_email, payload);
        }
    }

    fn lookup_pet(&self, application: &Application) -> Option<super::domain::Pet> {
        self.store
            .fetch_pet(&application.shelter_id, &application.microchip_id)
            .ok()
            .flatten()
    }

    fn lookup_shelter(&self, application: &Application) -> Option<ShelterContact> {
        match self.store.fetch_shelter(&application.shelter_id) {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    shelter = %application.shelter_id,
                    error = %err,
                    "shelter lookup failed while assembling emails"
                );
                None
            }
        }
    }
}
