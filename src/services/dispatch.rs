//! Delivery of weather messages to the watch.

use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::sync::Arc;

use crate::errors::DeliveryError;
use crate::services::appmessage::{OutboundMessage, MAX_MESSAGE_BYTES};
use crate::services::resolver::ResolvedConfig;
use crate::services::weather::WeatherReading;

/// Transport to the paired watch. Resolves once the watch has acknowledged
/// (`Ok`) or the send has failed; there is no retry.
pub trait MessageChannel: Send + Sync {
    fn deliver(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<(), DeliveryError>>;
}

/// Channel that hands encoded dictionaries to the phone-to-watch bridge over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBridgeChannel {
    client: reqwest::Client,
    url: String,
}

impl HttpBridgeChannel {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn post(&self, payload: Vec<u8>) -> Result<(), DeliveryError> {
        let size = payload.len();
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(format!("bridge request failed: {}", e)))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                Err(DeliveryError::Busy)
            }
            StatusCode::PAYLOAD_TOO_LARGE => Err(DeliveryError::PayloadTooLarge {
                size,
                max: MAX_MESSAGE_BYTES,
            }),
            s => Err(DeliveryError::Transport(format!("bridge returned HTTP {}", s))),
        }
    }
}

impl MessageChannel for HttpBridgeChannel {
    fn deliver(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<(), DeliveryError>> {
        Box::pin(self.post(payload))
    }
}

/// Builds outbound messages and sends them over the watch channel.
#[derive(Clone)]
pub struct MessageDispatcher {
    channel: Arc<dyn MessageChannel>,
    include_api_key: bool,
}

impl MessageDispatcher {
    pub fn new(channel: Arc<dyn MessageChannel>, include_api_key: bool) -> Self {
        Self {
            channel,
            include_api_key,
        }
    }

    /// Encode and deliver one message. Returns the message that was acknowledged.
    pub async fn send(
        &self,
        reading: &WeatherReading,
        config: &ResolvedConfig,
    ) -> Result<OutboundMessage, DeliveryError> {
        let message = OutboundMessage::new(reading, config, self.include_api_key);
        let payload = message.encode()?;
        let size = payload.len();

        // Failures surface to the trigger, which logs them with the run's stage.
        self.channel.deliver(payload).await?;
        tracing::info!(
            temperature_c = message.temperature_c,
            temperature_f = message.temperature_f,
            conditions = %message.conditions,
            bytes = size,
            "Weather sent to watch"
        );
        Ok(message)
    }
}
