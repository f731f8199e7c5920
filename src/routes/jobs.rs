//! Scheduled jobs, triggered by the external scheduler.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use chrono::Utc;
use tracing::{error, info};

use crate::routes::{AppState, ErrorBody};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/jobs/weather-cleanup", post(weather_cleanup))
        .route("/jobs/weather-refresh", post(weather_refresh))
}

/// Daily: reclaim expired cached weather.
async fn weather_cleanup(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    info!("POST /jobs/weather-cleanup");
    match state.janitor.sweep(Utc::now()).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            error!("Error cleaning up expired weather data: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Every two hours: make sure every field location has fresh weather.
async fn weather_refresh(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    info!("POST /jobs/weather-refresh");
    match state.orchestrator.refresh_weather(Utc::now()).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            error!("Error refreshing weather data: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response()
        }
    }
}
