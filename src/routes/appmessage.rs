//! Inbound watch messages.
//!
//! POST /api/v1/appmessage: the phone-to-watch bridge forwards every message
//! the watch sends. Any message counts as a refresh request; the optional JSON
//! body is only logged.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::services::events::{CompanionEvent, EventBus};

/// Shared state for the inbound message route.
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<EventBus>,
}

/// Response for an accepted watch message.
#[derive(Debug, Serialize, ToSchema)]
pub struct AppMessageAccepted {
    /// Always true; the refresh itself runs in the background
    pub accepted: bool,
    /// Number of refresh runs started
    pub runs: usize,
}

/// Receive a message from the watch and start a weather refresh.
#[utoipa::path(
    post,
    path = "/api/v1/appmessage",
    tag = "Watch",
    request_body(content = Option<serde_json::Value>, content_type = "application/json"),
    responses(
        (status = 202, description = "Refresh started", body = AppMessageAccepted),
        (status = 400, description = "Payload is not valid JSON", body = ErrorResponse),
    )
)]
pub async fn receive_app_message(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AppMessageAccepted>), AppError> {
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid message payload: {}", e)))?;
        Some(value)
    };

    // Runs are detached; their outcome is only logged.
    let runs = state.bus.emit(CompanionEvent::AppMessage { payload }).len();

    Ok((
        StatusCode::ACCEPTED,
        Json(AppMessageAccepted {
            accepted: true,
            runs,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::events::{EventHandler, EventName};
    use futures::FutureExt;
    use std::sync::Mutex;

    fn recording_bus() -> (Arc<EventBus>, Arc<Mutex<Vec<CompanionEvent>>>) {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: EventHandler = Arc::new(move |event: CompanionEvent| {
            sink.lock().unwrap().push(event);
            async {}.boxed()
        });
        bus.subscribe(EventName::AppMessage, handler);
        (bus, seen)
    }

    #[tokio::test]
    async fn test_empty_body_triggers_refresh() {
        let (bus, seen) = recording_bus();

        let (status, Json(body)) = receive_app_message(State(AppState { bus }), Bytes::new())
            .await
            .unwrap();

        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.accepted);
        assert_eq!(body.runs, 1);
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[CompanionEvent::AppMessage { payload: None }]
        );
    }

    #[tokio::test]
    async fn test_json_payload_is_forwarded() {
        let (bus, seen) = recording_bus();

        receive_app_message(
            State(AppState { bus }),
            Bytes::from_static(br#"{"REQUEST_WEATHER":1}"#),
        )
        .await
        .unwrap();

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[CompanionEvent::AppMessage {
                payload: Some(serde_json::json!({ "REQUEST_WEATHER": 1 }))
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected() {
        let (bus, seen) = recording_bus();

        let result =
            receive_app_message(State(AppState { bus }), Bytes::from_static(b"{oops")).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_openapi_documents_body_and_responses() {
        use utoipa::OpenApi;

        #[derive(OpenApi)]
        #[openapi(paths(receive_app_message))]
        struct Doc;

        let doc = serde_json::to_value(Doc::openapi()).unwrap();
        let post = &doc["paths"]["/api/v1/appmessage"]["post"];

        assert!(post["requestBody"]["content"]["application/json"].is_object());
        assert!(post["responses"]["202"].is_object());
        assert!(post["responses"]["400"].is_object());
    }
}
