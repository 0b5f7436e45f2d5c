use axum::{Router, routing::get};

pub mod ideas;
pub mod incubation;
pub mod items;
pub mod requests;
pub mod system;

/// Router for all endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/stream", get(system::stream))
        .nest("/items", items::router())
        .nest("/requests", requests::router())
        .nest("/ideas", ideas::router())
        .nest("/incubation", incubation::router())
}
