use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use idealab_core::DomainError;

/// Map the domain taxonomy onto HTTP, with one uniform body shape.
///
/// Insufficient-stock and already-processed messages are returned verbatim so
/// an admin can act on them immediately.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        DomainError::InvalidState(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_state", msg),
        err @ DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", err.to_string())
        }
        DomainError::Storage(msg) => {
            tracing::error!("storage failure: {msg}");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_failure",
                "storage failure",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
