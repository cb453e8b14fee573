use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{Application, ApplicationId, ApplicationStatus, Pet, ShelterContact, VisitType};

/// Outbound email payload handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

/// Payload pushed over the notification channel alongside the durable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_image: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("email transport unavailable: {0}")]
    Email(String),
    #[error("push channel unavailable: {0}")]
    Push(String),
}

/// Best-effort email delivery collaborator.
pub trait EmailSender: Send + Sync {
    fn send(&self, message: EmailMessage) -> Result<(), DispatchError>;
}

/// Best-effort push collaborator feeding the applicant's live notification feed.
pub trait PushChannel: Send + Sync {
    fn emit_user_notification(
        &self,
        recipient: &str,
        payload: NotificationPayload,
    ) -> Result<(), DispatchError>;
}

/// Wraps both collaborators with the swallow-and-log rule: no lifecycle
/// operation fails because a message could not be delivered.
pub(crate) struct Dispatcher<E, P> {
    email: Arc<E>,
    push: Arc<P>,
}

impl<E, P> Dispatcher<E, P>
where
    E: EmailSender,
    P: PushChannel,
{
    pub(crate) fn new(email: Arc<E>, push: Arc<P>) -> Self {
        Self { email, push }
    }

    pub(crate) fn send_email(&self, message: EmailMessage) {
        let recipient = message.recipient.clone();
        if let Err(err) = self.email.send(message) {
            warn!(%recipient, error = %err, "email dispatch failed");
        }
    }

    pub(crate) fn push(&self, recipient: &str, payload: NotificationPayload) {
        if let Err(err) = self.push.emit_user_notification(recipient, payload) {
            warn!(%recipient, error = %err, "push dispatch failed");
        }
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%A, %B %-d, %Y at %H:%M UTC").to_string()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

pub fn home_visit_request_email(application: &Application, deadline: NaiveDate) -> EmailMessage {
    EmailMessage {
        recipient: application.applicant_email.clone(),
        subject: "Schedule your home visit".to_string(),
        html_body: format!(
            "<p>Your adoption application {id} has moved to review. Please schedule \
             a home visit within one week, by {deadline}, or the application will \
             expire.</p>",
            id = application.id.0,
            deadline = format_date(deadline),
        ),
    }
}

pub fn home_visit_outcome_email(
    application: &Application,
    approved: bool,
    decided_at: DateTime<Utc>,
) -> EmailMessage {
    let (subject, verdict) = if approved {
        ("Home visit approved", "approved")
    } else {
        ("Home visit unsuccessful", "not approved")
    };
    EmailMessage {
        recipient: application.applicant_email.clone(),
        subject: subject.to_string(),
        html_body: format!(
            "<p>Your home visit for application {id} was {verdict}, confirmed on \
             {at}.</p>",
            id = application.id.0,
            at = format_timestamp(decided_at),
        ),
    }
}

pub fn adoption_confirmed_applicant_email(application: &Application, pet: Option<&Pet>) -> EmailMessage {
    let pet_name = pet.map(|p| p.name.as_str()).unwrap_or("your new companion");
    EmailMessage {
        recipient: application.applicant_email.clone(),
        subject: "Adoption confirmed".to_string(),
        html_body: format!(
            "<p>Congratulations! Application {id} is approved and {pet_name} is \
             coming home with you. The shelter will be in touch about pickup.</p>",
            id = application.id.0,
        ),
    }
}

pub fn adoption_confirmed_shelter_email(
    application: &Application,
    shelter: &ShelterContact,
) -> EmailMessage {
    EmailMessage {
        recipient: shelter.email.clone(),
        subject: "Adoption finalized".to_string(),
        html_body: format!(
            "<p>Application {id} for pet {chip} has been approved and the adoption \
             is confirmed for {applicant}.</p>",
            id = application.id.0,
            chip = application.microchip_id,
            applicant = application.applicant_email,
        ),
    }
}

pub fn rejection_applicant_email(application: &Application) -> EmailMessage {
    EmailMessage {
        recipient: application.applicant_email.clone(),
        subject: "Adoption application update".to_string(),
        html_body: format!(
            "<p>We are sorry: application {id} was not successful this time.</p>",
            id = application.id.0,
        ),
    }
}

pub fn rejection_shelter_email(application: &Application, shelter: &ShelterContact) -> EmailMessage {
    EmailMessage {
        recipient: shelter.email.clone(),
        subject: "Adoption not finalized".to_string(),
        html_body: format!(
            "<p>Application {id} for pet {chip} was not finalized; the pet remains \
             available for adoption.</p>",
            id = application.id.0,
            chip = application.microchip_id,
        ),
    }
}

pub fn pet_already_adopted_email(application: &Application) -> EmailMessage {
    EmailMessage {
        recipient: application.applicant_email.clone(),
        subject: "Pet no longer available".to_string(),
        html_body: format!(
            "<p>The pet you applied for under application {id} has been adopted by \
             another applicant, so the application has been closed. We hope another \
             companion catches your eye.</p>",
            id = application.id.0,
        ),
    }
}

pub fn reactivation_requested_email(
    application: &Application,
    shelter: &ShelterContact,
    reason_not_scheduled: &str,
    reason_to_reactivate: &str,
) -> EmailMessage {
    EmailMessage {
        recipient: shelter.email.clone(),
        subject: "Reactivation requested".to_string(),
        html_body: format!(
            "<p>The applicant on expired application {id} has asked to reopen it.</p>\
             <p>Why no visit was scheduled: {reason_not_scheduled}</p>\
             <p>Why it should be reactivated: {reason_to_reactivate}</p>",
            id = application.id.0,
        ),
    }
}

pub fn reactivation_declined_email(application: &Application) -> EmailMessage {
    EmailMessage {
        recipient: application.applicant_email.clone(),
        subject: "Reactivation declined".to_string(),
        html_body: format!(
            "<p>The shelter declined to reopen application {id}. This decision is \
             permanent and the application is now closed.</p>",
            id = application.id.0,
        ),
    }
}

/// Confirmation pair sent when a visit is booked: one to the applicant, one
/// to the shelter.
pub fn visit_confirmation_emails(
    application: &Application,
    shelter: &ShelterContact,
    visit_at: DateTime<Utc>,
    visit_type: VisitType,
) -> (EmailMessage, EmailMessage) {
    let when = format_timestamp(visit_at);
    let kind = visit_type.label();
    let to_applicant = EmailMessage {
        recipient: application.applicant_email.clone(),
        subject: format!("Your {kind} visit is booked"),
        html_body: format!(
            "<p>Your {kind} visit for application {id} is confirmed for {when}.</p>",
            id = application.id.0,
        ),
    };
    let to_shelter = EmailMessage {
        recipient: shelter.email.clone(),
        subject: format!("A {kind} visit was booked"),
        html_body: format!(
            "<p>A {kind} visit for application {id} (pet {chip}) is confirmed for \
             {when}.</p>",
            id = application.id.0,
            chip = application.microchip_id,
        ),
    };
    (to_applicant, to_shelter)
}

/// One-line summary used in the push payload for each status.
pub fn status_headline(status: ApplicationStatus) -> String {
    match status {
        ApplicationStatus::UnderReview => "Your application is under review".to_string(),
        ApplicationStatus::HomeVisitRequested => {
            "Please schedule your home visit within one week".to_string()
        }
        ApplicationStatus::HomeVisitScheduled => "Your home visit is booked".to_string(),
        ApplicationStatus::HomeApproved => "Your home visit was approved".to_string(),
        ApplicationStatus::HomeRejected => "Your home visit was not approved".to_string(),
        ApplicationStatus::UserVisitScheduled => "Your shelter visit is booked".to_string(),
        ApplicationStatus::Approved => "Your adoption is confirmed".to_string(),
        ApplicationStatus::Rejected => "Your application was not successful".to_string(),
        ApplicationStatus::ReactivationRequested => {
            "Your reactivation request was sent to the shelter".to_string()
        }
        ApplicationStatus::Closed => "Your application has been closed".to_string(),
        ApplicationStatus::Expired => "Your application has expired".to_string(),
    }
}
