//! Data models shared by the recommendation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReadingError, SkipReason};

// ---

/// Raw moisture reading as delivered on the shared sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorReading {
    // ---
    pub raw: f64,
    pub max_raw: f64,
}

impl SensorReading {
    // ---
    /// Validate a raw value against the sensor's range `[0, max_raw]`.
    pub fn new(raw: f64, max_raw: f64) -> Result<Self, ReadingError> {
        // ---
        if !raw.is_finite() {
            return Err(ReadingError::NotFinite);
        }
        if raw < 0.0 || raw > max_raw {
            return Err(ReadingError::OutOfRange { raw, max_raw });
        }
        Ok(Self { raw, max_raw })
    }

    /// Volumetric moisture as a fraction; a dry probe reads high.
    pub fn moisture_fraction(&self) -> f64 {
        (self.max_raw - self.raw) / self.max_raw
    }
}

/// Field metadata as written by the field-management UI.
///
/// Every attribute is optional at the storage level: the UI collaborator
/// may have written a partial document, and the orchestrator decides what
/// is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FieldInfo {
    // ---
    pub name: Option<String>,
    pub location: Option<String>,
    pub soil_type: Option<String>,
    pub crop_name: Option<String>,
    pub month_of_sowing: Option<String>,
    pub area: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// The subset of [`FieldInfo`] the engine needs, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldProfile {
    // ---
    pub location: String,
    pub soil_type: String,
    pub crop_name: String,
    pub month_of_sowing: String,
    pub area: f64,
}

impl FieldInfo {
    // ---
    /// Check that every attribute the engine needs is present and parse the
    /// area. Empty strings count as missing.
    pub fn profile(&self) -> Result<FieldProfile, SkipReason> {
        // ---
        let location = required(&self.location, "location")?;
        let soil_type = required(&self.soil_type, "soil_type")?;
        let crop_name = required(&self.crop_name, "crop_name")?;
        let area_raw = required(&self.area, "area")?;
        let month_of_sowing = required(&self.month_of_sowing, "month_of_sowing")?;

        let area = area_raw
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite() && *a >= 0.0)
            .ok_or_else(|| SkipReason::InvalidArea(area_raw.clone()))?;

        Ok(FieldProfile {
            location,
            soil_type,
            crop_name,
            month_of_sowing,
            area,
        })
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, SkipReason> {
    // ---
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(SkipReason::MissingAttribute(name)),
    }
}

/// Atmospheric snapshot for one location, as held in the weather cache.
///
/// Units: °C, %, kPa, m/s, mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CachedWeather {
    // ---
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub windspeed: f64,
    pub rain: f64,
    pub captured_at: DateTime<Utc>,
}

/// Per-soil-type constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilParameters {
    // ---
    pub field_capacity_fraction: f64,
    pub wilting_point_fraction: f64,
    #[serde(rename = "rootZoneDepthMM")]
    pub root_zone_depth_mm: f64,
}

impl Default for SoilParameters {
    fn default() -> Self {
        Self {
            field_capacity_fraction: 0.35,
            wilting_point_fraction: 0.15,
            root_zone_depth_mm: 500.0,
        }
    }
}

/// Phenological stage of a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthStage {
    // ---
    Initial,
    Development,
    MidSeason,
    LateSeason,
}

impl GrowthStage {
    // ---
    /// Key used by the crop-coefficient table and the stored document.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthStage::Initial => "initial",
            GrowthStage::Development => "development",
            GrowthStage::MidSeason => "mid-season",
            GrowthStage::LateSeason => "late-season",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initial" => Some(GrowthStage::Initial),
            "development" => Some(GrowthStage::Development),
            "mid-season" => Some(GrowthStage::MidSeason),
            "late-season" => Some(GrowthStage::LateSeason),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Irrigation recommendation, each value formatted with two decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    // ---
    pub irrigation_per_square_meter: String,
    pub total_water_to_release_liters: String,
    /// Pump-on duration in hours.
    pub total_time_to_release: String,
}

/// The recommendation document persisted per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecommendation {
    // ---
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub growth_stage: GrowthStage,
    pub crop_coefficient: f64,
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn complete_info() -> FieldInfo {
        // ---
        FieldInfo {
            name: Some("North plot".to_string()),
            location: Some("Ajmer".to_string()),
            soil_type: Some("Loamy".to_string()),
            crop_name: Some("Wheat".to_string()),
            month_of_sowing: Some("November".to_string()),
            area: Some("2.5".to_string()),
            created_at: None,
        }
    }

    #[test]
    fn test_moisture_fraction() {
        // ---
        let reading = SensorReading::new(500.0, 1024.0).unwrap();
        assert!((reading.moisture_fraction() - 0.51171875).abs() < 1e-12);

        let dry = SensorReading::new(1024.0, 1024.0).unwrap();
        assert_eq!(dry.moisture_fraction(), 0.0);

        let wet = SensorReading::new(0.0, 1024.0).unwrap();
        assert_eq!(wet.moisture_fraction(), 1.0);
    }

    #[test]
    fn test_reading_out_of_range_rejected() {
        // ---
        assert!(matches!(
            SensorReading::new(-1.0, 1024.0),
            Err(ReadingError::OutOfRange { .. })
        ));
        assert!(matches!(
            SensorReading::new(1025.0, 1024.0),
            Err(ReadingError::OutOfRange { .. })
        ));
        assert!(matches!(
            SensorReading::new(f64::NAN, 1024.0),
            Err(ReadingError::NotFinite)
        ));
    }

    #[test]
    fn test_profile_complete() {
        // ---
        let profile = complete_info().profile().unwrap();
        assert_eq!(profile.location, "Ajmer");
        assert_eq!(profile.area, 2.5);
    }

    #[test]
    fn test_profile_missing_and_empty_attributes() {
        // ---
        let mut info = complete_info();
        info.area = None;
        assert_eq!(info.profile(), Err(SkipReason::MissingAttribute("area")));

        let mut info = complete_info();
        info.location = Some("   ".to_string());
        assert_eq!(info.profile(), Err(SkipReason::MissingAttribute("location")));
    }

    #[test]
    fn test_profile_rejects_non_numeric_area() {
        // ---
        let mut info = complete_info();
        info.area = Some("two acres".to_string());
        assert_eq!(
            info.profile(),
            Err(SkipReason::InvalidArea("two acres".to_string()))
        );

        info.area = Some("-3".to_string());
        assert!(matches!(info.profile(), Err(SkipReason::InvalidArea(_))));
    }

    #[test]
    fn test_growth_stage_keys() {
        // ---
        for stage in [
            GrowthStage::Initial,
            GrowthStage::Development,
            GrowthStage::MidSeason,
            GrowthStage::LateSeason,
        ] {
            assert_eq!(GrowthStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(
            serde_json::to_string(&GrowthStage::MidSeason).unwrap(),
            "\"mid-season\""
        );
    }
}
