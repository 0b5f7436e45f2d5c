use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use idealab_core::IdeaId;
use idealab_ideas::{IdeaDraft, IdeaStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_ideas).post(submit_idea))
        .route("/:id/status", post(advance_idea))
}

pub async fn submit_idea(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SubmitIdeaBody>,
) -> axum::response::Response {
    let draft = IdeaDraft {
        title: body.title,
        description: body.description,
        category: body.category,
    };
    match services.submit_idea(body.user_id, draft).await {
        Ok(idea) => (StatusCode::CREATED, Json(idea)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_ideas(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::UserScopedQuery>,
) -> axum::response::Response {
    match services.list_ideas(query.user_id).await {
        Ok(ideas) => (StatusCode::OK, Json(ideas)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn advance_idea(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::StatusBody>,
) -> axum::response::Response {
    let id: IdeaId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid idea id"),
    };
    let next = match body.status.parse::<IdeaStatus>() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.advance_idea(id, next).await {
        Ok(idea) => (StatusCode::OK, Json(idea)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
