use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

/// Errors surfaced by the local HTTP endpoints.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

/// Startup configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("LOCATION_LAT and LOCATION_LON must be set together")]
    PartialCoordinates,
}

/// Location acquisition errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable: {0}")]
    Unavailable(String),
    #[error("Location request timed out after {0} ms")]
    Timeout(u64),
    /// The source answered, but not with a usable fix.
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather API errors. Any of these aborts the run before dispatch.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Invalid weather request: {0}")]
    InvalidRequest(String),
    #[error("Weather request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Weather API returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("Weather response is not valid: {0}")]
    Parse(String),
    #[error("Weather response is missing {0}")]
    MissingField(&'static str),
}

/// Delivery errors reported by the wearable message channel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Message channel busy")]
    Busy,
    #[error("Message of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("Message transport failed: {0}")]
    Transport(String),
}

/// A failed pipeline run. Every variant is terminal for the run that produced it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No API key configured")]
    MissingApiKey,
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl PipelineError {
    /// Short stage label for structured logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::MissingApiKey => "configuration",
            PipelineError::Location(_) => "location",
            PipelineError::Weather(_) => "weather",
            PipelineError::Delivery(_) => "delivery",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_stage() {
        assert_eq!(PipelineError::MissingApiKey.stage(), "configuration");
        assert_eq!(
            PipelineError::from(LocationError::Timeout(15000)).stage(),
            "location"
        );
        assert_eq!(
            PipelineError::from(WeatherError::MissingField("main.temp")).stage(),
            "weather"
        );
        assert_eq!(PipelineError::from(DeliveryError::Busy).stage(), "delivery");
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = DeliveryError::PayloadTooLarge { size: 300, max: 256 };
        assert_eq!(
            err.to_string(),
            "Message of 300 bytes exceeds the 256 byte limit"
        );
    }
}
