//! OpenWeatherMap current-weather client.
//!
//! Fetches the current conditions for a coordinate pair.
//! See: https://openweathermap.org/current

use reqwest::Url;
use serde::Deserialize;

use crate::errors::WeatherError;
use crate::helpers::{celsius_to_fahrenheit, kelvin_to_celsius};
use crate::services::location::Coordinates;

/// Client for the OpenWeatherMap current-weather endpoint.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    endpoint: String,
}

/// Normalized current weather, as shown on the watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReading {
    pub temperature_c: i32,
    pub temperature_f: i32,
    /// Short condition group, e.g. "Clouds" or "Rain".
    pub conditions: String,
}

impl WeatherReading {
    /// Build a reading from the provider's Kelvin temperature.
    pub fn from_kelvin(kelvin: f64, conditions: impl Into<String>) -> Self {
        let temperature_c = kelvin_to_celsius(kelvin);
        Self {
            temperature_c,
            temperature_f: celsius_to_fahrenheit(temperature_c),
            conditions: conditions.into(),
        }
    }
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: Option<OwmMain>,
    #[serde(default)]
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    main: Option<String>,
}

impl WeatherClient {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    /// Build the request URL. Coordinates are passed through unchanged; the
    /// API key is percent-encoded (a space becomes `%20`, not `+`).
    pub fn request_url(&self, coords: &Coordinates, api_key: &str) -> Result<Url, WeatherError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| WeatherError::InvalidRequest(format!("bad endpoint: {}", e)))?;
        let params = format!(
            "lat={}&lon={}&appid={}",
            coords.latitude,
            coords.longitude,
            urlencoding::encode(api_key)
        );
        let query = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{}&{}", existing, params),
            _ => params,
        };
        url.set_query(Some(&query));
        Ok(url)
    }

    /// Fetch the current weather. Issues exactly one GET; no retries.
    pub async fn fetch(
        &self,
        coords: &Coordinates,
        api_key: &str,
    ) -> Result<WeatherReading, WeatherError> {
        let url = self.request_url(coords, api_key)?;

        // The request URL carries the key, so it is stripped from transport errors.
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherError::Request(e.without_url()))?;

        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Request(e.without_url()))?;
        parse_current_weather(&body)
    }
}

/// Parse a current-weather body into a reading.
///
/// Pure function (no I/O). Requires a finite `main.temp` and at least one
/// `weather` entry with a `main` label; only the first entry is used.
pub fn parse_current_weather(body: &str) -> Result<WeatherReading, WeatherError> {
    let parsed: OwmResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let kelvin = parsed
        .main
        .and_then(|m| m.temp)
        .ok_or(WeatherError::MissingField("main.temp"))?;
    if !kelvin.is_finite() {
        return Err(WeatherError::Parse(format!(
            "temperature {} is not finite",
            kelvin
        )));
    }

    let conditions = parsed
        .weather
        .into_iter()
        .next()
        .ok_or(WeatherError::MissingField("weather[0]"))?
        .main
        .ok_or(WeatherError::MissingField("weather[0].main"))?;

    Ok(WeatherReading::from_kelvin(kelvin, conditions))
}
