//! Inbound events from the real-time channel.
//!
//! The channel platform calls these when a value is written: the shared
//! moisture reading, or the pump switch toggled from the app.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::SensorReading;
use crate::routes::{AppState, ErrorBody};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/events/sensor-moisture", post(sensor_moisture))
        .route("/events/pump-state", post(pump_state))
}

/// New value on the moisture channel.
#[derive(Debug, Deserialize)]
pub struct MoistureEvent {
    value: f64,
}

/// Pump switch before and after the write.
#[derive(Debug, Deserialize)]
pub struct PumpStateEvent {
    before: Option<bool>,
    after: Option<bool>,
}

async fn sensor_moisture(
    State(state): State<AppState>,
    Json(event): Json<MoistureEvent>,
) -> impl IntoResponse {
    // ---
    info!("POST /events/sensor-moisture - value {}", event.value);

    let reading = match SensorReading::new(event.value, state.sensor_max_raw) {
        Ok(reading) => reading,
        Err(e) => {
            warn!("Rejected moisture reading: {}", e);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response();
        }
    };

    let report = state
        .orchestrator
        .on_sensor_value_changed(reading, Utc::now())
        .await;
    (StatusCode::OK, Json(report)).into_response()
}

async fn pump_state(Json(event): Json<PumpStateEvent>) -> StatusCode {
    // ---
    info!(
        "Irrigation pump control state changed from {:?} to {:?}",
        event.before, event.after
    );
    StatusCode::NO_CONTENT
}
