//! Irrigation recommendation engine.
//!
//! Turns a soil-moisture reading into a per-field irrigation recommendation
//! for every field of every user, using cached weather, crop growth stage
//! and soil reference data.
//!
//! Modules, leaf-first:
//! - `reference` – crop coefficient, growth cycle and soil tables
//! - `weather` – location-keyed cache, API client and fetch-on-miss
//! - `growth` – growth stage from month of sowing
//! - `water_balance` – evapotranspiration and irrigation requirement
//! - `orchestrator` – fan-out over users and fields
//! - `janitor` – reclamation of expired cached weather
//! - `store` – document-store ports with PostgreSQL and in-memory backends
//! - `routes` – HTTP trigger adapters

pub mod config;
pub mod error;
pub mod growth;
pub mod janitor;
pub mod models;
pub mod orchestrator;
pub mod reference;
pub mod routes;
pub mod schema;
pub mod store;
pub mod water_balance;
pub mod weather;

pub use config::Config;
pub use error::{SkipReason, StoreError, WeatherError};
pub use janitor::{CacheJanitor, JanitorReport};
pub use models::{CachedWeather, FieldInfo, GrowthStage, Recommendation, SensorReading, SoilParameters, StoredRecommendation};
pub use orchestrator::{FieldStatus, Orchestrator, RefreshReport, SweepReport};
pub use reference::ReferenceTables;
pub use routes::AppState;
pub use water_balance::WaterBalanceConstants;
