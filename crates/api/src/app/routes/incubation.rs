use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use idealab_core::IncubationId;
use idealab_incubation::{JobDraft, JobStatus, Machine};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_jobs).post(submit_job))
        .route("/:id/status", post(advance_job))
        .route("/:id/cancel", post(cancel_job))
}

pub async fn submit_job(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SubmitJobBody>,
) -> axum::response::Response {
    let machine = match body.machine.parse::<Machine>() {
        Ok(m) => m,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let draft = JobDraft {
        machine,
        title: body.title,
        details: body.details,
    };
    match services.submit_job(body.user_id, draft).await {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::UserScopedQuery>,
) -> axum::response::Response {
    match services.list_jobs(query.user_id).await {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn advance_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::StatusBody>,
) -> axum::response::Response {
    let id: IncubationId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };
    let next = match body.status.parse::<JobStatus>() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.advance_job(id, next).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn cancel_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelBody>,
) -> axum::response::Response {
    let id: IncubationId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };
    match services.cancel_job(id, body.user_id).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
