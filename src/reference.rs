//! Static crop and soil reference tables.
//!
//! Loaded once at startup, either from the JSON documents embedded in the
//! binary or from files named in the configuration. Lookups are
//! case-insensitive because the field UI writes display names ("Wheat")
//! while the tables are keyed in lower case.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ReferenceError;
use crate::models::{GrowthStage, SoilParameters};

// ---

const EMBEDDED_CROPS: &str = include_str!("../data/crop_coefficients.json");
const EMBEDDED_SOILS: &str = include_str!("../data/soil_types.json");

/// Used when a crop or stage has no coefficient.
pub const DEFAULT_CROP_COEFFICIENT: f64 = 1.0;

/// Months spent in each phenological stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthCycle {
    // ---
    pub initial: u32,
    pub development: u32,
    pub mid_season: u32,
    pub late_season: u32,
}

#[derive(Debug, Deserialize)]
struct CropDocument {
    // ---
    crop_coefficients: HashMap<String, HashMap<String, f64>>,
    #[serde(default)]
    growth_cycles: HashMap<String, GrowthCycle>,
}

/// Crop coefficients, growth cycles and soil parameters.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    // ---
    crop_coefficients: HashMap<String, HashMap<String, f64>>,
    growth_cycles: HashMap<String, GrowthCycle>,
    soils: HashMap<String, SoilParameters>,
}

impl ReferenceTables {
    // ---
    /// Tables compiled into the binary.
    pub fn embedded() -> Result<Self, ReferenceError> {
        Self::from_json(EMBEDDED_CROPS, EMBEDDED_SOILS)
    }

    /// Load tables, preferring the given files over the embedded defaults.
    pub fn load(
        crops_path: Option<&Path>,
        soils_path: Option<&Path>,
    ) -> Result<Self, ReferenceError> {
        // ---
        let crops = match crops_path {
            Some(path) => read(path)?,
            None => EMBEDDED_CROPS.to_string(),
        };
        let soils = match soils_path {
            Some(path) => read(path)?,
            None => EMBEDDED_SOILS.to_string(),
        };
        Self::from_json(&crops, &soils)
    }

    /// Parse both documents.
    pub fn from_json(crops: &str, soils: &str) -> Result<Self, ReferenceError> {
        // ---
        let crops: CropDocument = serde_json::from_str(crops).map_err(|source| {
            ReferenceError::Parse {
                name: "crop_coefficients",
                source,
            }
        })?;
        let soils: HashMap<String, SoilParameters> =
            serde_json::from_str(soils).map_err(|source| ReferenceError::Parse {
                name: "soil_types",
                source,
            })?;

        Ok(Self {
            crop_coefficients: lowercase_keys(crops.crop_coefficients),
            growth_cycles: lowercase_keys(crops.growth_cycles),
            soils: lowercase_keys(soils),
        })
    }

    /// Whether the crop has a coefficient entry at all.
    pub fn knows_crop(&self, crop: &str) -> bool {
        self.crop_coefficients.contains_key(&key(crop))
    }

    pub fn growth_cycle(&self, crop: &str) -> Option<GrowthCycle> {
        self.growth_cycles.get(&key(crop)).copied()
    }

    /// Kc for a crop at a stage, falling back to [`DEFAULT_CROP_COEFFICIENT`].
    pub fn crop_coefficient(&self, crop: &str, stage: GrowthStage) -> f64 {
        // ---
        match self
            .crop_coefficients
            .get(&key(crop))
            .and_then(|stages| stages.get(stage.as_str()))
        {
            Some(kc) => *kc,
            None => {
                tracing::warn!(
                    "No crop coefficient for {} at stage {}, using {}",
                    crop,
                    stage,
                    DEFAULT_CROP_COEFFICIENT
                );
                DEFAULT_CROP_COEFFICIENT
            }
        }
    }

    /// Soil parameters, falling back to [`SoilParameters::default`].
    pub fn soil(&self, soil_type: &str) -> SoilParameters {
        // ---
        match self.soils.get(&key(soil_type)) {
            Some(params) => *params,
            None => {
                tracing::warn!("Unknown soil type {}, using default parameters", soil_type);
                SoilParameters::default()
            }
        }
    }

    /// Log how many entries were loaded.
    pub fn log_summary(&self) {
        tracing::info!(
            "Reference tables loaded: {} crops, {} growth cycles, {} soil types",
            self.crop_coefficients.len(),
            self.growth_cycles.len(),
            self.soils.len()
        );
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn lowercase_keys<V>(map: HashMap<String, V>) -> HashMap<String, V> {
    map.into_iter().map(|(k, v)| (key(&k), v)).collect()
}

fn read(path: &Path) -> Result<String, ReferenceError> {
    std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_embedded_tables_parse() {
        // ---
        let tables = ReferenceTables::embedded().unwrap();
        for crop in ["wheat", "rice", "corn", "soybean", "potato"] {
            assert!(tables.knows_crop(crop), "missing crop {}", crop);
            assert!(tables.growth_cycle(crop).is_some(), "missing cycle {}", crop);
        }
    }

    #[test]
    fn test_lookups_ignore_case() {
        // ---
        let tables = ReferenceTables::embedded().unwrap();
        assert_eq!(
            tables.crop_coefficient("Wheat", GrowthStage::MidSeason),
            tables.crop_coefficient("wheat", GrowthStage::MidSeason)
        );
        assert_eq!(tables.soil("SANDY"), tables.soil("Sandy"));
        assert_eq!(
            tables.growth_cycle("Corn"),
            Some(GrowthCycle {
                initial: 1,
                development: 3,
                mid_season: 3,
                late_season: 2
            })
        );
    }

    #[test]
    fn test_defaults_for_unknown_entries() {
        // ---
        let tables = ReferenceTables::embedded().unwrap();
        assert_eq!(tables.soil("Peat"), SoilParameters::default());
        assert_eq!(
            tables.crop_coefficient("quinoa", GrowthStage::Initial),
            DEFAULT_CROP_COEFFICIENT
        );
        assert_eq!(tables.growth_cycle("quinoa"), None);
    }

    #[test]
    fn test_missing_stage_defaults() {
        // ---
        let crops = r#"{ "crop_coefficients": { "millet": { "initial": 0.4 } } }"#;
        let tables = ReferenceTables::from_json(crops, "{}").unwrap();
        assert_eq!(tables.crop_coefficient("millet", GrowthStage::Initial), 0.4);
        assert_eq!(tables.crop_coefficient("millet", GrowthStage::LateSeason), 1.0);
        assert!(tables.growth_cycle("millet").is_none());
    }

    #[test]
    fn test_malformed_json_rejected() {
        // ---
        let err = ReferenceTables::from_json("{", "{}").unwrap_err();
        assert!(matches!(
            err,
            ReferenceError::Parse {
                name: "crop_coefficients",
                ..
            }
        ));
    }
}
