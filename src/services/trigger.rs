//! Binds pipeline runs to host events.
//!
//! Both `ready` and `appmessage` start a full run. Runs are not debounced or
//! cancelled: a slow run started earlier can finish after a newer one and
//! overwrite the watch display with older data.

use futures::FutureExt;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::services::events::{CompanionEvent, EventBus, EventHandler, EventName, SubscriptionId};
use crate::services::pipeline::Pipeline;

/// Active subscriptions for one bound pipeline.
#[derive(Debug)]
pub struct EventTrigger {
    subscriptions: Vec<(EventName, SubscriptionId)>,
}

impl EventTrigger {
    /// Subscribe `pipeline` to every event that should refresh the watch.
    pub fn bind(bus: &EventBus, pipeline: Arc<Pipeline>) -> Self {
        let subscriptions = [EventName::Ready, EventName::AppMessage]
            .into_iter()
            .map(|name| (name, bus.subscribe(name, run_handler(pipeline.clone()))))
            .collect();
        Self { subscriptions }
    }

    pub fn unbind(self, bus: &EventBus) {
        for (name, id) in self.subscriptions {
            bus.unsubscribe(name, id);
        }
    }
}

fn run_handler(pipeline: Arc<Pipeline>) -> EventHandler {
    Arc::new(move |event: CompanionEvent| {
        let pipeline = pipeline.clone();
        let span = tracing::info_span!("run", run_id = %Uuid::new_v4(), trigger = %event.name());

        async move {
            match &event {
                CompanionEvent::Ready => tracing::info!("Companion ready"),
                CompanionEvent::AppMessage { payload } => {
                    tracing::info!(payload = ?payload, "Message received from watch")
                }
            }

            if let Err(e) = pipeline.run().await {
                tracing::warn!(stage = e.stage(), "Weather refresh abandoned: {}", e);
            }
        }
        .instrument(span)
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pipeline::test_support::{pipeline, RecordingChannel};
    use crate::services::settings::{MemorySettingsStore, Settings};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn weather_server(delay: Duration) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "weather": [{ "main": "Clear" }], "main": { "temp": 300.0 } }))
                    .set_delay(delay),
            )
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn settings() -> Arc<MemorySettingsStore> {
        Arc::new(MemorySettingsStore::new(Settings::from(json!({ "APIKEY": "U" }))))
    }

    #[tokio::test]
    async fn test_back_to_back_triggers_run_independently() {
        let mock_server = weather_server(Duration::from_millis(50)).await;
        let channel = Arc::new(RecordingChannel::default());
        let bus = EventBus::new();
        let _trigger = EventTrigger::bind(
            &bus,
            Arc::new(pipeline(settings(), None, &mock_server.uri(), channel.clone())),
        );

        let mut handles = bus.emit(CompanionEvent::Ready);
        handles.extend(bus.emit(CompanionEvent::AppMessage {
            payload: Some(json!({ "REQUEST": 1 })),
        }));
        assert_eq!(handles.len(), 2);

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(channel.count(), 2);
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_run_does_not_affect_next_trigger() {
        let mock_server = weather_server(Duration::ZERO).await;
        let store = settings();
        store.replace(Settings::default());
        let channel = Arc::new(RecordingChannel::default());
        let bus = EventBus::new();
        let _trigger = EventTrigger::bind(
            &bus,
            Arc::new(pipeline(store.clone(), None, &mock_server.uri(), channel.clone())),
        );

        for handle in bus.emit(CompanionEvent::Ready) {
            handle.await.unwrap();
        }
        assert_eq!(channel.count(), 0);

        store.replace(Settings::from(json!({ "APIKEY": "U" })));
        for handle in bus.emit(CompanionEvent::AppMessage { payload: None }) {
            handle.await.unwrap();
        }
        assert_eq!(channel.count(), 1);
    }

    #[tokio::test]
    async fn test_unbind_stops_runs() {
        let mock_server = weather_server(Duration::ZERO).await;
        let channel = Arc::new(RecordingChannel::default());
        let bus = EventBus::new();
        let trigger = EventTrigger::bind(
            &bus,
            Arc::new(pipeline(settings(), None, &mock_server.uri(), channel.clone())),
        );

        trigger.unbind(&bus);

        assert!(bus.emit(CompanionEvent::Ready).is_empty());
        assert_eq!(channel.count(), 0);
    }
}
