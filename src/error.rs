//! Error types for the recommendation engine.
//!
//! None of these terminate the service: the orchestrator turns them into a
//! per-field [`SkipReason`] and carries on with the next field.

use serde::Serialize;
use thiserror::Error;

// ---

/// Failure talking to the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Storage error: {0}")]
    Unavailable(String),
}

/// Failure obtaining weather for a location.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// Built through `From`, which drops the request URL: it carries the
    /// API key as a query parameter.
    #[error("Weather API request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Weather API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse weather response: {0}")]
    Decode(String),

    #[error("Failed to cache weather: {0}")]
    Cache(#[from] StoreError),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Request(err.without_url())
    }
}

/// Failure estimating a growth stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrowthError {
    #[error("Invalid month of sowing: {0}")]
    InvalidSowingMonth(String),
}

/// A sensor value rejected before any sweep starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadingError {
    #[error("Sensor value is not a finite number")]
    NotFinite,

    #[error("Sensor value {raw} outside of [0, {max_raw}]")]
    OutOfRange { raw: f64, max_raw: f64 },
}

/// Failure loading the static reference tables.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed reference table {name}: {source}")]
    Parse {
        name: &'static str,
        source: serde_json::Error,
    },
}

/// Why a field was left without a fresh recommendation.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("Field info document not found")]
    FieldInfoMissing,

    #[error("Missing required attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("Area is not a usable number: {0}")]
    InvalidArea(String),

    #[error("Invalid month of sowing: {0}")]
    InvalidSowingMonth(String),

    #[error("Weather unavailable: {0}")]
    WeatherUnavailable(String),

    #[error("Store read failed: {0}")]
    StoreRead(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),
}

impl From<GrowthError> for SkipReason {
    fn from(err: GrowthError) -> Self {
        match err {
            GrowthError::InvalidSowingMonth(month) => SkipReason::InvalidSowingMonth(month),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_skip_reason_serializes_with_kind() {
        // ---
        let json = serde_json::to_value(SkipReason::MissingAttribute("area")).unwrap();
        assert_eq!(json["kind"], "missing_attribute");
        assert_eq!(json["detail"], "area");

        let json = serde_json::to_value(SkipReason::FieldInfoMissing).unwrap();
        assert_eq!(json["kind"], "field_info_missing");
    }

    #[test]
    fn test_growth_error_maps_to_skip_reason() {
        // ---
        let reason: SkipReason = GrowthError::InvalidSowingMonth("Smarch".into()).into();
        assert_eq!(reason, SkipReason::InvalidSowingMonth("Smarch".into()));
        assert!(reason.to_string().contains("Smarch"));
    }
}
