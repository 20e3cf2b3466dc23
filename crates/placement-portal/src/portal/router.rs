use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Actor, ApplicationDraft, ApplicationId, ApplicationStatus, JobDraft, JobFilter, JobId,
    JobStatus, Registration, ReviewDecision, Role, StatusFilter,
};
use super::report::{ExportEntity, ExportError};
use super::repository::PortalRepository;
use super::service::{PlacementPortal, PortalError};

/// Header carrying the username vouched for by the upstream gateway.
pub const ACTOR_HEADER: &str = "x-portal-user";

pub fn portal_router<R>(portal: Arc<PlacementPortal<R>>) -> Router
where
    R: PortalRepository + 'static,
{
    Router::new()
        .route("/api/v1/users", post(register_handler::<R>))
        .route("/api/v1/sessions", post(login_handler::<R>))
        .route(
            "/api/v1/jobs",
            get(list_jobs_handler::<R>).post(post_job_handler::<R>),
        )
        .route("/api/v1/jobs/:job_id", get(get_job_handler::<R>))
        .route("/api/v1/jobs/:job_id/status", put(job_status_handler::<R>))
        .route(
            "/api/v1/jobs/:job_id/applications",
            post(apply_handler::<R>),
        )
        .route("/api/v1/applications", get(list_applications_handler::<R>))
        .route(
            "/api/v1/applications/:application_id",
            get(get_application_handler::<R>),
        )
        .route(
            "/api/v1/applications/:application_id/review",
            put(review_handler::<R>),
        )
        .route("/api/v1/reports/summary", get(summary_handler::<R>))
        .route(
            "/api/v1/reports/export/:entity",
            get(export_handler::<R>),
        )
        .with_state(portal)
}

/// Map a service error onto its HTTP status with a JSON `error` body.
pub fn error_response(err: PortalError) -> Response {
    let status = match &err {
        PortalError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PortalError::DuplicateUsername
        | PortalError::DuplicateEmail
        | PortalError::AlreadyApplied(_)
        | PortalError::JobClosed(_)
        | PortalError::InvalidTransition { .. } => StatusCode::CONFLICT,
        PortalError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        PortalError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        PortalError::UserNotFound(_)
        | PortalError::JobNotFound(_)
        | PortalError::ApplicationNotFound(_) => StatusCode::NOT_FOUND,
        PortalError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PortalError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &err {
        PortalError::Validation { field, .. } => json!({
            "error": err.to_string(),
            "field": field,
        }),
        _ => json!({ "error": err.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

fn unprocessable(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn unauthorized(message: &str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, PortalError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Resolve the acting user; a missing header or an unknown user is 401.
fn resolve_actor<R>(portal: &PlacementPortal<R>, headers: &HeaderMap) -> Result<Actor, Response>
where
    R: PortalRepository + 'static,
{
    let username = headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| unauthorized("missing x-portal-user header"))?;

    match portal.actor(username) {
        Ok(actor) => Ok(actor),
        Err(PortalError::UserNotFound(_)) => Err(unauthorized("unknown portal user")),
        Err(other) => Err(error_response(other)),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobsQuery {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostJobRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(flatten)]
    pub draft: JobDraft,
}

#[derive(Debug, Deserialize)]
pub struct JobStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

async fn register_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    axum::Json(registration): axum::Json<Registration>,
) -> Response
where
    R: PortalRepository + 'static,
{
    respond(StatusCode::CREATED, portal.identity.register(registration))
}

async fn login_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Response
where
    R: PortalRepository + 'static,
{
    respond(
        StatusCode::OK,
        portal
            .identity
            .authenticate(&request.username, &request.password),
    )
}

async fn list_jobs_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    Query(query): Query<JobsQuery>,
) -> Response
where
    R: PortalRepository + 'static,
{
    let status = match query.status.as_deref() {
        None => StatusFilter::ActiveOnly,
        Some(raw) => match raw.parse::<StatusFilter>() {
            Ok(status) => status,
            Err(err) => return unprocessable(err.to_string()),
        },
    };
    let filter = JobFilter {
        company: query
            .company
            .map(|company| company.trim().to_string())
            .filter(|company| !company.is_empty()),
        status,
    };
    respond(StatusCode::OK, portal.jobs.list_jobs(&filter))
}

async fn post_job_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<PostJobRequest>,
) -> Response
where
    R: PortalRepository + 'static,
{
    let actor = match resolve_actor(&portal, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let company = request
        .company
        .unwrap_or_else(|| actor.username.clone());
    respond(
        StatusCode::CREATED,
        portal.jobs.post_job(&actor, &company, request.draft),
    )
}

async fn get_job_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    Path(job_id): Path<u64>,
) -> Response
where
    R: PortalRepository + 'static,
{
    let id = JobId(job_id);
    let result = portal
        .jobs
        .get_job(id)
        .and_then(|job| job.ok_or(PortalError::JobNotFound(id)));
    respond(StatusCode::OK, result)
}

async fn job_status_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
    axum::Json(request): axum::Json<JobStatusRequest>,
) -> Response
where
    R: PortalRepository + 'static,
{
    let actor = match resolve_actor(&portal, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let status = match request.status.parse::<JobStatus>() {
        Ok(status) => status,
        Err(err) => return unprocessable(err.to_string()),
    };
    respond(
        StatusCode::OK,
        portal.jobs.set_job_status(&actor, JobId(job_id), status),
    )
}

async fn apply_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
    axum::Json(draft): axum::Json<ApplicationDraft>,
) -> Response
where
    R: PortalRepository + 'static,
{
    let actor = match resolve_actor(&portal, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::CREATED,
        portal
            .applications
            .apply(&actor, &actor.username, JobId(job_id), draft),
    )
}

async fn list_applications_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: PortalRepository + 'static,
{
    let actor = match resolve_actor(&portal, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let result = match actor.role {
        Role::Student => portal.applications.list_for_student(&actor, &actor.username),
        Role::Company => portal.applications.list_for_company(&actor, &actor.username),
        Role::Admin => portal.applications.list_all(&actor),
    };
    respond(StatusCode::OK, result)
}

async fn get_application_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    headers: HeaderMap,
    Path(application_id): Path<u64>,
) -> Response
where
    R: PortalRepository + 'static,
{
    let actor = match resolve_actor(&portal, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(
        StatusCode::OK,
        portal
            .applications
            .get_application(&actor, ApplicationId(application_id)),
    )
}

async fn review_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    headers: HeaderMap,
    Path(application_id): Path<u64>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: PortalRepository + 'static,
{
    let actor = match resolve_actor(&portal, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let status = match request.status.parse::<ApplicationStatus>() {
        Ok(status) => status,
        Err(err) => return unprocessable(err.to_string()),
    };
    let decision = ReviewDecision {
        status,
        feedback: request.feedback,
    };
    respond(
        StatusCode::OK,
        portal
            .applications
            .review(&actor, ApplicationId(application_id), decision),
    )
}

async fn summary_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: PortalRepository + 'static,
{
    let actor = match resolve_actor(&portal, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    respond(StatusCode::OK, portal.reports.summary(&actor))
}

async fn export_handler<R>(
    State(portal): State<Arc<PlacementPortal<R>>>,
    headers: HeaderMap,
    Path(entity): Path<String>,
) -> Response
where
    R: PortalRepository + 'static,
{
    let actor = match resolve_actor(&portal, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let entity = match entity.parse::<ExportEntity>() {
        Ok(entity) => entity,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
        }
    };

    let mut body = Vec::new();
    match portal.reports.export_csv(&actor, entity, &mut body) {
        Ok(_) => {
            let headers = [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", entity.file_name()),
                ),
            ];
            (StatusCode::OK, headers, body).into_response()
        }
        Err(ExportError::Portal(err)) => error_response(err),
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
