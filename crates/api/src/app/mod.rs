//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store handles, event bus, realtime broadcast
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs and JSON mapping
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use idealab_core::DomainResult;

use crate::config::Config;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &Config) -> DomainResult<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router_with(services))
}

/// Attach services to the route tree. Split out so tests can wire an
/// in-memory store directly.
pub fn router_with(services: Arc<services::AppServices>) -> Router {
    routes::router().layer(ServiceBuilder::new().layer(Extension(services)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    use idealab_store::InMemoryStore;

    use super::services::AppServices;

    fn test_app() -> Router {
        let store = Arc::new(InMemoryStore::new());
        let services = Arc::new(AppServices::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
        ));
        super::router_with(services)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_item(app: &Router, name: &str, total: i64) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/items",
            Some(json!({
                "name": name,
                "category": "electronics",
                "description": "",
                "quantity_total": total,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    fn requester() -> Value {
        json!({
            "name": "Asha",
            "department": "ECE",
            "phone": "9999999999",
            "purpose": "line follower robot",
        })
    }

    async fn submit_request(app: &Router, user_id: &str, item_id: &str, quantity: i64) -> Value {
        let (status, body) = send(
            app,
            "POST",
            "/requests",
            Some(json!({
                "user_id": user_id,
                "requester": requester(),
                "items": [{"id": item_id, "quantity": quantity}],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    fn fresh_user() -> String {
        uuid::Uuid::now_v7().to_string()
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let app = test_app();
        let (status, _) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn submit_then_approve_decrements_stock() {
        let app = test_app();
        let item_id = create_item(&app, "Arduino Uno", 10).await;
        let request = submit_request(&app, &fresh_user(), &item_id, 3).await;
        let request_id = request["id"].as_str().unwrap();

        let (status, body) =
            send(&app, "POST", &format!("/requests/{request_id}/approve"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["request"]["status"], json!("approved"));

        let (status, items) = send(&app, "GET", "/items", None).await;
        assert_eq!(status, StatusCode::OK);
        let item = items
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["id"] == json!(item_id))
            .unwrap();
        assert_eq!(item["quantity_available"], json!(7));
    }

    #[tokio::test]
    async fn approval_fails_fast_with_item_name_when_stock_is_short() {
        let app = test_app();
        let item_id = create_item(&app, "Raspberry Pi 4", 2).await;
        let request = submit_request(&app, &fresh_user(), &item_id, 5).await;
        let request_id = request["id"].as_str().unwrap();

        let (status, body) =
            send(&app, "POST", &format!("/requests/{request_id}/approve"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("insufficient_stock"));
        assert!(body["message"].as_str().unwrap().contains("Raspberry Pi 4"));

        // Stock untouched and the request still actionable.
        let (_, items) = send(&app, "GET", "/items", None).await;
        let item = items
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["id"] == json!(item_id))
            .unwrap();
        assert_eq!(item["quantity_available"], json!(2));
        let (status, body) = send(&app, "GET", &format!("/requests/{request_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("submitted"));
    }

    #[tokio::test]
    async fn approving_twice_is_rejected_as_invalid_state() {
        let app = test_app();
        let item_id = create_item(&app, "Jumper wires", 50).await;
        let request = submit_request(&app, &fresh_user(), &item_id, 10).await;
        let request_id = request["id"].as_str().unwrap();

        let (status, _) =
            send(&app, "POST", &format!("/requests/{request_id}/approve"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&app, "POST", &format!("/requests/{request_id}/approve"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("invalid_state"));
    }

    #[tokio::test]
    async fn cancel_is_owner_only() {
        let app = test_app();
        let owner = fresh_user();
        let item_id = create_item(&app, "ESP32", 5).await;
        let request = submit_request(&app, &owner, &item_id, 1).await;
        let request_id = request["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/requests/{request_id}/cancel"),
            Some(json!({"user_id": fresh_user()})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], json!("forbidden"));

        let (status, body) = send(
            &app,
            "POST",
            &format!("/requests/{request_id}/cancel"),
            Some(json!({"user_id": owner})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["request"]["status"], json!("cancelled"));
    }

    #[tokio::test]
    async fn submitting_for_an_unknown_item_is_not_found() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/requests",
            Some(json!({
                "user_id": fresh_user(),
                "requester": requester(),
                "items": [{"id": uuid::Uuid::now_v7().to_string(), "quantity": 1}],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("not_found"));
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_requests() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/requests/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("invalid_id"));

        let (status, _) = send(
            &app,
            "GET",
            &format!("/requests/{}", uuid::Uuid::now_v7()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn idea_walks_its_review_lifecycle() {
        let app = test_app();
        let (status, idea) = send(
            &app,
            "POST",
            "/ideas",
            Some(json!({
                "user_id": fresh_user(),
                "title": "Smart irrigation",
                "description": "Soil moisture driven drip control",
                "category": "agritech",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let idea_id = idea["id"].as_str().unwrap();

        for next in ["under_review", "approved", "completed"] {
            let (status, body) = send(
                &app,
                "POST",
                &format!("/ideas/{idea_id}/status"),
                Some(json!({"status": next})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], json!(next));
        }

        let (status, body) = send(
            &app,
            "POST",
            &format!("/ideas/{idea_id}/status"),
            Some(json!({"status": "rejected"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("invalid_state"));
    }

    #[tokio::test]
    async fn incubation_job_rejects_unknown_machine() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/incubation",
            Some(json!({
                "user_id": fresh_user(),
                "machine": "cnc",
                "title": "bracket",
                "details": "",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("invalid_input"));
    }
}
