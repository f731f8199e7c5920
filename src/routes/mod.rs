//! HTTP trigger adapters.
//!
//! The engine does not know how it is invoked; these routes turn platform
//! triggers into calls on the orchestrator and janitor.

use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use crate::janitor::CacheJanitor;
use crate::orchestrator::Orchestrator;

mod events;
mod health;
mod jobs;

// ---

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub orchestrator: Arc<Orchestrator>,
    pub janitor: Arc<CacheJanitor>,
    pub sensor_max_raw: f64,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    error: String,
}

impl ErrorBody {
    pub(crate) fn new(error: String) -> Self {
        Self { error }
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(events::router())
        .merge(jobs::router())
        .merge(health::router())
        .with_state(state)
}
