use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
};

use crate::app::services::{self, AppServices};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    services::sse_stream(services)
}
