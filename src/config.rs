use std::path::PathBuf;

use crate::errors::ConfigError;

/// Fallback API key baked in at build time (`DEFAULT_API_KEY=... cargo build`).
const COMPILED_DEFAULT_API_KEY: Option<&str> = option_env!("DEFAULT_API_KEY");

const DEFAULT_WEATHER_API_URL: &str = "http://api.openweathermap.org/data/2.5/weather";
const DEFAULT_WATCH_BRIDGE_URL: &str = "http://127.0.0.1:9000/appmessage";
const DEFAULT_GEOLOCATION_URL: &str = "http://ip-api.com/json";

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON file holding the persisted watch-face settings.
    pub settings_path: PathBuf,
    /// Key used when the user has not entered one.
    pub default_api_key: Option<String>,
    pub weather_api_url: String,
    pub watch_bridge_url: String,
    /// Fixed (latitude, longitude); when absent the geolocation service is used.
    pub fixed_location: Option<(f64, f64)>,
    pub geolocation_url: String,
    pub location_timeout_ms: u64,
    pub location_max_age_ms: u64,
    /// Echo the active API key back to the watch.
    pub send_api_key: bool,
    pub port: u16,
    pub log_json: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_api_key = lookup("DEFAULT_API_KEY")
            .or_else(|| COMPILED_DEFAULT_API_KEY.map(str::to_string))
            .filter(|k| !k.is_empty());

        let fixed_location = match (lookup("LOCATION_LAT"), lookup("LOCATION_LON")) {
            (Some(lat), Some(lon)) => Some((
                parse_var("LOCATION_LAT", &lat, "a number")?,
                parse_var("LOCATION_LON", &lon, "a number")?,
            )),
            (None, None) => None,
            _ => return Err(ConfigError::PartialCoordinates),
        };

        Ok(Self {
            settings_path: PathBuf::from(
                lookup("SETTINGS_PATH").unwrap_or_else(|| "./data/clay-settings.json".to_string()),
            ),
            default_api_key,
            weather_api_url: lookup("WEATHER_API_URL")
                .unwrap_or_else(|| DEFAULT_WEATHER_API_URL.to_string()),
            watch_bridge_url: lookup("WATCH_BRIDGE_URL")
                .unwrap_or_else(|| DEFAULT_WATCH_BRIDGE_URL.to_string()),
            fixed_location,
            geolocation_url: lookup("GEOLOCATION_URL")
                .unwrap_or_else(|| DEFAULT_GEOLOCATION_URL.to_string()),
            location_timeout_ms: parse_var(
                "LOCATION_TIMEOUT_MS",
                &lookup("LOCATION_TIMEOUT_MS").unwrap_or_else(|| "15000".to_string()),
                "a duration in milliseconds",
            )?,
            location_max_age_ms: parse_var(
                "LOCATION_MAX_AGE_MS",
                &lookup("LOCATION_MAX_AGE_MS").unwrap_or_else(|| "60000".to_string()),
                "a duration in milliseconds",
            )?,
            send_api_key: parse_var(
                "SEND_API_KEY",
                &lookup("SEND_API_KEY").unwrap_or_else(|| "true".to_string()),
                "true or false",
            )?,
            port: parse_var(
                "PORT",
                &lookup("PORT").unwrap_or_else(|| "8080".to_string()),
                "a valid u16",
            )?,
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        expected,
        value: value.to_string(),
    })
}
