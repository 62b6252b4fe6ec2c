//! Current-location lookup for the host device.
//!
//! `LocationProvider` mirrors the platform geolocation contract: a fix younger
//! than `max_cache_age` is reused, otherwise a fresh fix is requested from the
//! configured `PositionSource` and must arrive within `timeout`.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::LocationError;

/// A geographic fix.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated accuracy radius, when the source reports one.
    pub accuracy_m: Option<f64>,
    /// When the fix was obtained.
    pub timestamp: DateTime<Utc>,
}

/// Bounds for a single location request.
#[derive(Debug, Clone, Copy)]
pub struct LocationOptions {
    pub timeout: Duration,
    pub max_cache_age: Duration,
}

impl LocationOptions {
    pub fn from_millis(timeout_ms: u64, max_cache_age_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            max_cache_age: Duration::from_millis(max_cache_age_ms),
        }
    }
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self::from_millis(15_000, 60_000)
    }
}

/// Something that can produce a fresh position fix.
pub trait PositionSource: Send + Sync {
    fn acquire(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>>;
}

/// A position pinned in configuration.
#[derive(Debug, Clone)]
pub struct FixedPosition {
    latitude: f64,
    longitude: f64,
}

impl FixedPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl PositionSource for FixedPosition {
    fn acquire(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>> {
        Box::pin(async move {
            Ok(Coordinates {
                latitude: self.latitude,
                longitude: self.longitude,
                accuracy_m: None,
                timestamp: Utc::now(),
            })
        })
    }
}

/// Response of a network geolocation service (ip-api compatible).
#[derive(Debug, Deserialize)]
struct GeolocationResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    accuracy: Option<f64>,
}

/// Position from a network geolocation service.
#[derive(Debug, Clone)]
pub struct HttpGeolocation {
    client: reqwest::Client,
    url: String,
}

impl HttpGeolocation {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn lookup(&self) -> Result<Coordinates, LocationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocationError::Unavailable(format!("geolocation request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LocationError::PermissionDenied);
        }
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!(
                "geolocation service returned HTTP {}",
                status
            )));
        }

        let body: GeolocationResponse = response.json().await.map_err(|e| {
            LocationError::Other(format!("geolocation response unreadable: {}", e))
        })?;

        if body.status.as_deref() == Some("fail") {
            return Err(LocationError::Unavailable(
                body.message
                    .unwrap_or_else(|| "geolocation lookup failed".to_string()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
                Ok(Coordinates {
                    latitude,
                    longitude,
                    accuracy_m: body.accuracy,
                    timestamp: Utc::now(),
                })
            }
            _ => Err(LocationError::Other(
                "geolocation response has no coordinates".to_string(),
            )),
        }
    }
}

impl PositionSource for HttpGeolocation {
    fn acquire(&self) -> BoxFuture<'_, Result<Coordinates, LocationError>> {
        Box::pin(self.lookup())
    }
}

/// Location lookups with a fix cache and a per-request timeout.
pub struct LocationProvider {
    source: Arc<dyn PositionSource>,
    last_fix: Mutex<Option<Coordinates>>,
}

impl LocationProvider {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self {
            source,
            last_fix: Mutex::new(None),
        }
    }

    /// Return the current location, reusing a fix younger than
    /// `options.max_cache_age`.
    ///
    /// The cache lock is never held across the acquisition, so concurrent runs
    /// may each request their own fix.
    pub async fn current_location(
        &self,
        options: LocationOptions,
    ) -> Result<Coordinates, LocationError> {
        if let Some(cached) = self.cached_fix(options.max_cache_age) {
            tracing::debug!("Reusing cached location fix from {}", cached.timestamp);
            return Ok(cached);
        }

        let timeout_ms = u64::try_from(options.timeout.as_millis()).unwrap_or(u64::MAX);
        let fix = tokio::time::timeout(options.timeout, self.source.acquire())
            .await
            .map_err(|_| LocationError::Timeout(timeout_ms))??;

        self.store_fix(&fix);
        Ok(fix)
    }

    fn cached_fix(&self, max_age: Duration) -> Option<Coordinates> {
        let guard = match self.last_fix.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let fix = guard.as_ref()?;
        // A fix stamped in the future (clock adjustment) counts as fresh.
        let age = (Utc::now() - fix.timestamp).to_std().unwrap_or_default();
        (age < max_age).then(|| fix.clone())
    }

    fn store_fix(&self, fix: &Coordinates) {
        let mut guard = match self.last_fix.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(fix.clone());
    }
}
