use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use idealab_core::RequestId;
use idealab_inventory::RequestStatus;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_requests).post(submit_request))
        .route("/:id", get(get_request))
        .route("/:id/approve", post(approve_request))
        .route("/:id/reject", post(reject_request))
        .route("/:id/cancel", post(cancel_request))
}

fn parse_id(id: &str) -> Result<RequestId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
    })
}

pub async fn submit_request(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SubmitRequestBody>,
) -> axum::response::Response {
    let lines = body.items.iter().map(|l| (l.id, l.quantity)).collect();
    match services.submit_request(body.user_id, body.requester, lines).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// With `?user_id=` this is the requester's own list; without it, the admin
/// list (optionally filtered by `?status=`). Both return the same nested
/// shape.
pub async fn list_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::RequestListQuery>,
) -> axum::response::Response {
    if let Some(user_id) = query.user_id {
        return match services.requests_for_user(user_id).await {
            Ok(views) => (StatusCode::OK, Json(views)).into_response(),
            Err(e) => errors::domain_error_to_response(e),
        };
    }

    let status = match query.status.as_deref() {
        Some(raw) => match raw.parse::<RequestStatus>() {
            Ok(s) => Some(s),
            Err(e) => return errors::domain_error_to_response(e),
        },
        None => None,
    };
    match services.all_requests(status).await {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_request(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.request(id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn approve_request(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.approve_request(id).await {
        Ok(view) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "request": view })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn reject_request(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.reject_request(id).await {
        Ok(view) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "request": view })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn cancel_request(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelBody>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.cancel_request(id, body.user_id).await {
        Ok(view) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "request": view })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
