// Weather Companion v0.1
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::appmessage::AppState;
use services::dispatch::{HttpBridgeChannel, MessageDispatcher};
use services::events::{CompanionEvent, EventBus};
use services::location::{
    FixedPosition, HttpGeolocation, LocationOptions, LocationProvider, PositionSource,
};
use services::pipeline::Pipeline;
use services::resolver::ConfigResolver;
use services::settings::FileSettingsStore;
use services::trigger::EventTrigger;
use services::weather::WeatherClient;

/// Weather Companion OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather Companion",
        version = "0.1.0",
        description = "Phone-side companion for a watch face. Reads the saved watch-face \
            settings, looks up the current location and weather, and relays temperature \
            and conditions to the watch.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Watch", description = "Messages from the watch"),
    ),
    paths(
        routes::health::health_check,
        routes::appmessage::receive_app_message,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::appmessage::AppMessageAccepted,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "weather_companion=debug,tower_http=debug".into());
    if config.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("WeatherCompanion/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let position_source: Arc<dyn PositionSource> = match config.fixed_location {
        Some((lat, lon)) => {
            tracing::info!("Using fixed location {}, {}", lat, lon);
            Arc::new(FixedPosition::new(lat, lon))
        }
        None => {
            tracing::info!("Using geolocation service {}", config.geolocation_url);
            Arc::new(HttpGeolocation::new(http.clone(), &config.geolocation_url))
        }
    };

    if config.default_api_key.is_none() {
        tracing::warn!("No default API key configured; refreshes need a key in the settings");
    }

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(FileSettingsStore::new(&config.settings_path)),
        ConfigResolver::new(config.default_api_key.clone()),
        LocationProvider::new(position_source),
        LocationOptions::from_millis(config.location_timeout_ms, config.location_max_age_ms),
        WeatherClient::new(http.clone(), &config.weather_api_url),
        MessageDispatcher::new(
            Arc::new(HttpBridgeChannel::new(http, &config.watch_bridge_url)),
            config.send_api_key,
        ),
    ));

    let bus = Arc::new(EventBus::new());
    let trigger = EventTrigger::bind(&bus, pipeline);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/appmessage",
            post(routes::appmessage::receive_app_message),
        )
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .with_state(AppState { bus: bus.clone() })
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Companion listening on {}", addr);

    // Activation: one refresh as soon as the companion is up.
    bus.emit(CompanionEvent::Ready);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight runs finish on their own; no new ones start.
    trigger.unbind(&bus);
    tracing::info!("Companion stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
