//! The companion pipeline: settings → location → weather → watch.
//!
//! One call to `Pipeline::run` is one best-effort refresh. Each stage either
//! produces a complete value or aborts the run; nothing partial is ever sent.
//! Runs share no mutable state apart from the location fix cache, so
//! overlapping runs proceed independently and may deliver out of order.

use std::sync::Arc;

use crate::errors::PipelineError;
use crate::services::appmessage::OutboundMessage;
use crate::services::dispatch::MessageDispatcher;
use crate::services::location::{LocationOptions, LocationProvider};
use crate::services::resolver::ConfigResolver;
use crate::services::settings::SettingsStore;
use crate::services::weather::WeatherClient;

pub struct Pipeline {
    settings: Arc<dyn SettingsStore>,
    resolver: ConfigResolver,
    location: LocationProvider,
    location_options: LocationOptions,
    weather: WeatherClient,
    dispatcher: MessageDispatcher,
}

impl Pipeline {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        resolver: ConfigResolver,
        location: LocationProvider,
        location_options: LocationOptions,
        weather: WeatherClient,
        dispatcher: MessageDispatcher,
    ) -> Self {
        Self {
            settings,
            resolver,
            location,
            location_options,
            weather,
            dispatcher,
        }
    }

    /// Run one refresh and return the message the watch acknowledged.
    pub async fn run(&self) -> Result<OutboundMessage, PipelineError> {
        // Settings are re-read on every run so saves take effect immediately.
        let settings = self.settings.read();
        if settings.is_empty() {
            tracing::debug!("No saved settings, using defaults");
        }
        let config = self.resolver.resolve(&settings);

        let Some(api_key) = config.api_key.as_ref() else {
            tracing::warn!("Aborting weather fetch: no API key configured");
            return Err(PipelineError::MissingApiKey);
        };
        tracing::debug!(key_source = ?api_key.source(), "Resolved API key");

        let coords = self
            .location
            .current_location(self.location_options)
            .await?;
        tracing::debug!(
            latitude = coords.latitude,
            longitude = coords.longitude,
            "Location acquired"
        );

        let reading = self.weather.fetch(&coords, api_key.as_str()).await?;
        tracing::info!(
            "Temp: {}C / {}F, conditions: {}",
            reading.temperature_c,
            reading.temperature_f,
            reading.conditions
        );

        let message = self.dispatcher.send(&reading, &config).await?;
        Ok(message)
    }
}
