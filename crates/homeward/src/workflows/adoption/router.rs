use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, ActorRole, ApplicationId, ApplicationStatus, StatusChange, VisitType,
};
use super::messaging::{EmailSender, PushChannel};
use super::repository::{AdoptionStore, ApplicationFilter, Page};
use super::service::{AdoptionService, AdoptionServiceError};

/// Router builder exposing the adoption lifecycle endpoints. Identity arrives
/// from the upstream auth layer as `x-actor-email` / `x-actor-role` headers.
pub fn adoption_router<S, E, P>(service: Arc<AdoptionService<S, E, P>>) -> Router
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    Router::new()
        .route(
            "/api/v1/adoption/applications",
            post(create_handler::<S, E, P>).get(list_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id",
            get(detail_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id/status",
            put(status_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id/visits",
            post(schedule_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/applications/:application_id/reactivation",
            post(reactivation_request_handler::<S, E, P>)
                .get(reactivation_detail_handler::<S, E, P>),
        )
        .route(
            "/api/v1/adoption/shelters/:shelter_id/pets/:microchip_id/slots",
            get(slots_handler::<S, E, P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateApplicationRequest {
    pub(crate) shelter_id: String,
    pub(crate) microchip_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    pub(crate) shelter_id: Option<String>,
    pub(crate) status: Option<ApplicationStatus>,
    pub(crate) applicant_email: Option<String>,
    #[serde(default)]
    pub(crate) offset: usize,
    pub(crate) limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateStatusRequest {
    pub(crate) status: StatusChange,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleVisitRequest {
    pub(crate) visit_at: DateTime<Utc>,
    pub(crate) visit_type: VisitType,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReactivationRequestBody {
    pub(crate) reason_not_scheduled: String,
    pub(crate) reason_to_reactivate: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlotsQuery {
    pub(crate) date: NaiveDate,
    pub(crate) visit_type: VisitType,
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let email = headers
        .get("x-actor-email")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let role = headers
        .get("x-actor-role")
        .and_then(|value| value.to_str().ok())
        .and_then(ActorRole::parse_external);

    match (email, role) {
        (Some(email), Some(role)) if !email.is_empty() => Ok(Actor { email, role }),
        _ => Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "missing or invalid actor identity" })),
        )
            .into_response()),
    }
}

fn error_response(err: AdoptionServiceError) -> Response {
    let status = match &err {
        AdoptionServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        AdoptionServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        AdoptionServiceError::Conflict(_) => StatusCode::CONFLICT,
        AdoptionServiceError::InvalidDate(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdoptionServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

pub(crate) async fn create_handler<S, E, P>(
    State(service): State<Arc<AdoptionService<S, E, P>>>,
    headers: HeaderMap,
    Json(request): Json<CreateApplicationRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    if actor.role != ActorRole::Applicant {
        return error_response(AdoptionServiceError::Forbidden(
            "applications are created by applicants".to_string(),
        ));
    }

    let intake = super::domain::ApplicationIntake {
        shelter_id: request.shelter_id,
        microchip_id: request.microchip_id,
        applicant_email: actor.email,
    };
    match service.create_application(intake) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<S, E, P>(
    State(service): State<Arc<AdoptionService<S, E, P>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    let filter = ApplicationFilter {
        shelter_id: query.shelter_id,
        status: query.status,
        applicant_email: query.applicant_email,
    };
    let page = Page {
        offset: query.offset,
        limit: query.limit.unwrap_or(Page::default().limit),
    };
    match service.list_applications(&filter, page) {
        Ok(applications) => (StatusCode::OK, Json(applications)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn detail_handler<S, E, P>(
    State(service): State<Arc<AdoptionService<S, E, P>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    match service.get_application(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<S, E, P>(
    State(service): State<Arc<AdoptionService<S, E, P>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UpdateStatusRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.update_status(&ApplicationId(application_id), request.status, &actor) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn schedule_handler<S, E, P>(
    State(service): State<Arc<AdoptionService<S, E, P>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ScheduleVisitRequest>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.schedule_visit(
        &ApplicationId(application_id),
        request.visit_at,
        request.visit_type,
        &actor,
    ) {
        Ok(application) => (StatusCode::OK, Json(application)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reactivation_request_handler<S, E, P>(
    State(service): State<Arc<AdoptionService<S, E, P>>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ReactivationRequestBody>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.request_reactivation(
        &ApplicationId(application_id),
        request.reason_not_scheduled,
        request.reason_to_reactivate,
        &actor,
    ) {
        Ok(reactivation) => (StatusCode::CREATED, Json(reactivation)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reactivation_detail_handler<S, E, P>(
    State(service): State<Arc<AdoptionService<S, E, P>>>,
    Path(application_id): Path<String>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    match service.get_reactivation_request(&ApplicationId(application_id)) {
        Ok(reactivation) => (StatusCode::OK, Json(reactivation)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn slots_handler<S, E, P>(
    State(service): State<Arc<AdoptionService<S, E, P>>>,
    Path((shelter_id, microchip_id)): Path<(String, String)>,
    Query(query): Query<SlotsQuery>,
) -> Response
where
    S: AdoptionStore + 'static,
    E: EmailSender + 'static,
    P: PushChannel + 'static,
{
    match service.available_slots(&shelter_id, &microchip_id, query.date, query.visit_type) {
        Ok(slots) => (StatusCode::OK, Json(json!({ "slots": slots }))).into_response(),
        Err(err) => error_response(err),
    }
}
