pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;

use crate::events::handlers as events;
use crate::metadata::handlers as metadata;
use crate::responses::handlers as responses;
use crate::state::AppState;

/// Acknowledgement body returned by write endpoints.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Calendar mirror
        .route("/api/events", get(events::handle_list_events))
        .route("/api/events/:event_id", get(events::handle_get_event))
        .route("/api/events/:event_id/image", get(events::handle_event_image))
        // Responses
        .route(
            "/api/events/:event_id/responses",
            get(responses::handle_list_responses),
        )
        .route(
            "/api/events/:event_id/respond",
            post(responses::handle_respond),
        )
        .route(
            "/api/events/:event_id/responses/:participant_id",
            delete(responses::handle_delete_response),
        )
        .route("/api/responses", get(responses::handle_list_all_responses))
        .route("/api/statistics", get(responses::handle_statistics))
        // Metadata
        .route(
            "/api/events/:event_id/metadata",
            get(metadata::handle_get_metadata)
                .post(metadata::handle_upsert_metadata)
                .delete(metadata::handle_delete_metadata),
        )
        .route("/api/metadata", get(metadata::handle_list_metadata))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{Config, StorageBackend};
    use crate::events::{Event, EventSource};
    use crate::metadata::store::MetadataStore;
    use crate::responses::store::ResponseStore;
    use crate::storage::{Collection, MemoryCollection, StorageError};

    struct StaticEvents(Vec<Event>);

    #[async_trait]
    impl EventSource for StaticEvents {
        async fn list_events(&self) -> Result<Vec<Event>, StorageError> {
            Ok(self.0.clone())
        }
    }

    /// A collection whose backend is permanently down.
    struct DownCollection;

    #[async_trait]
    impl Collection for DownCollection {
        fn name(&self) -> &str {
            "down"
        }
        async fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
        async fn put(&self, _key: &str, _value: Value) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<bool, StorageError> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
        async fn scan(&self, _prefix: &str) -> Result<Vec<(String, Value)>, StorageError> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
    }

    fn test_config(degrade_reads: bool) -> Config {
        Config {
            storage: StorageBackend::Memory,
            data_dir: PathBuf::from("unused"),
            events_file: None,
            events_limit: 10,
            degrade_reads,
            port: 0,
            rust_log: "info".into(),
        }
    }

    fn bingo_event() -> Event {
        Event {
            id: "bingo1".into(),
            title: "Bingo solidario".into(),
            description: "Cartones gratis".into(),
            location: "Biblioteca Municipal".into(),
            date: "2099-01-15T17:00:00Z".into(),
            end_date: None,
        }
    }

    fn app() -> Router {
        build_router(AppState {
            responses: ResponseStore::new(Arc::new(MemoryCollection::new("event_responses"))),
            metadata: MetadataStore::new(Arc::new(MemoryCollection::new("event_metadata"))),
            events: Arc::new(StaticEvents(vec![bingo_event()])),
            config: test_config(false),
        })
    }

    fn down_app(degrade_reads: bool) -> Router {
        build_router(AppState {
            responses: ResponseStore::new(Arc::new(DownCollection)),
            metadata: MetadataStore::new(Arc::new(DownCollection)),
            events: Arc::new(StaticEvents(vec![])),
            config: test_config(degrade_reads),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "memory");
    }

    #[tokio::test]
    async fn test_respond_then_list() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/events/e1/respond",
            Some(json!({"responseType": "like", "participantId": "u1", "timestamp": "2025-01-01T10:00:00Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);

        let (status, body) = send(&app, Method::GET, "/api/events/e1/responses", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "id": "e1_u1",
                "participantId": "u1",
                "responseType": "like",
                "timestamp": "2025-01-01T10:00:00Z"
            }])
        );
    }

    #[tokio::test]
    async fn test_respond_validation_errors() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/events/e1/respond",
            Some(json!({"responseType": "like"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/events/e1/respond",
            Some(json!({"participantId": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/events/e1/respond",
            Some(json!({"responseType": "meh", "participantId": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, Method::GET, "/api/statistics", None).await;
        assert_eq!(body["totals"]["totalResponses"], 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let app = app();
        send(
            &app,
            Method::POST,
            "/api/events/e1/respond",
            Some(json!({"responseType": "dislike", "userId": "u1"})),
        )
        .await;

        for _ in 0..2 {
            let (status, body) =
                send(&app, Method::DELETE, "/api/events/e1/responses/u1", None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
        }
        let (_, body) = send(&app, Method::GET, "/api/events/e1/responses", None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_statistics_and_grouped_listing() {
        let app = app();
        for (event, participant, kind) in [
            ("e1", "u1", "like"),
            ("e1", "u2", "like"),
            ("e1", "u3", "dislike"),
            ("e2", "u1", "like"),
        ] {
            let (status, _) = send(
                &app,
                Method::POST,
                &format!("/api/events/{event}/respond"),
                Some(json!({"responseType": kind, "participantId": participant})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = send(&app, Method::GET, "/api/statistics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "events": {
                    "e1": {"likes": 2, "dislikes": 1, "totalResponses": 3},
                    "e2": {"likes": 1, "dislikes": 0, "totalResponses": 1}
                },
                "totals": {"likes": 3, "dislikes": 1, "totalResponses": 4, "eventCount": 2}
            })
        );

        let (_, body) = send(&app, Method::GET, "/api/responses", None).await;
        assert_eq!(body["e1"].as_array().unwrap().len(), 3);
        assert_eq!(body["e2"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_metadata_merge_and_clear() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/events/nonexistent/metadata", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));

        send(
            &app,
            Method::POST,
            "/api/events/e1/metadata",
            Some(json!({"imagePath": "a.jpg", "additionalInfo": "old"})),
        )
        .await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/events/e1/metadata",
            Some(json!({"additionalInfo": "new"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, Method::GET, "/api/events/e1/metadata", None).await;
        assert_eq!(body["imagePath"], "a.jpg");
        assert_eq!(body["additionalInfo"], "new");
        assert!(body["lastUpdated"].is_string());

        send(
            &app,
            Method::POST,
            "/api/events/e1/metadata",
            Some(json!({"imagePath": null})),
        )
        .await;
        let (_, body) = send(&app, Method::GET, "/api/events/e1/metadata", None).await;
        assert!(body.get("imagePath").is_none());
        assert_eq!(body["additionalInfo"], "new");

        let (_, body) = send(&app, Method::GET, "/api/metadata", None).await;
        assert!(body.get("e1").is_some());

        let (status, _) = send(&app, Method::DELETE, "/api/events/e1/metadata", None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, Method::GET, "/api/events/e1/metadata", None).await;
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_metadata_rejects_unknown_category() {
        let (status, _) = send(
            &app(),
            Method::POST,
            "/api/events/e1/metadata",
            Some(json!({"imageCategory": "skydiving"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_image_resolution_precedence() {
        let app = app();
        send(
            &app,
            Method::POST,
            "/api/events/bingo1/metadata",
            Some(json!({"imagePath": "x.jpg", "imageCategory": "bingo"})),
        )
        .await;
        let (_, body) = send(&app, Method::GET, "/api/events/bingo1/image", None).await;
        assert_eq!(body["image"], "x.jpg");

        send(
            &app,
            Method::POST,
            "/api/events/bingo1/metadata",
            Some(json!({"imagePath": null})),
        )
        .await;
        let (_, body) = send(&app, Method::GET, "/api/events/bingo1/image", None).await;
        assert_eq!(body["image"], "/images/categories/bingo.jpg");

        send(
            &app,
            Method::POST,
            "/api/events/bingo1/metadata",
            Some(json!({"imageCategory": null})),
        )
        .await;
        let (_, body) = send(&app, Method::GET, "/api/events/bingo1/image", None).await;
        assert_eq!(body["image"], "/images/locations/library.jpg");
    }

    #[tokio::test]
    async fn test_events_are_decorated() {
        let app = app();
        send(
            &app,
            Method::POST,
            "/api/events/bingo1/metadata",
            Some(json!({"additionalInfo": "Trae tu bolígrafo"})),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/api/events", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "bingo1");
        assert_eq!(body[0]["image"], "/images/locations/library.jpg");
        assert_eq!(body[0]["additionalInfo"], "Trae tu bolígrafo");

        let (status, _) = send(&app, Method::GET, "/api/events/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let app = down_app(false);
        let (status, body) = send(&app, Method::GET, "/api/statistics", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "STORAGE_UNAVAILABLE");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/events/e1/respond",
            Some(json!({"responseType": "like", "participantId": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_degraded_reads_never_mask_writes() {
        let app = down_app(true);
        let (status, body) = send(&app, Method::GET, "/api/statistics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totals"]["eventCount"], 0);

        let (status, body) = send(&app, Method::GET, "/api/events/e1/responses", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/events/e1/metadata",
            Some(json!({"additionalInfo": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = send(&app, Method::DELETE, "/api/events/e1/responses/u1", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
