//! Crop growth-stage estimation from the month of sowing.

use chrono::{DateTime, Datelike, Month, Utc};

use crate::error::GrowthError;
use crate::models::GrowthStage;
use crate::reference::{GrowthCycle, ReferenceTables};

// ---

/// Parse a month name ("November", "nov") into 1–12.
pub fn parse_month(name: &str) -> Result<u32, GrowthError> {
    // ---
    name.trim()
        .parse::<Month>()
        .map(|m| m.number_from_month())
        .map_err(|_| GrowthError::InvalidSowingMonth(name.to_string()))
}

/// Months elapsed since sowing, wrapping over the year boundary.
///
/// Both arguments are 1–12; the result is always in `[0, 11]`.
pub fn months_since_sowing(sowing_month: u32, current_month: u32) -> u32 {
    // ---
    if sowing_month <= current_month {
        current_month - sowing_month
    } else {
        (12 - sowing_month) + current_month
    }
}

/// Map elapsed months onto a stage using cumulative thresholds.
///
/// The mid-season bound counts `initial` twice. Recommendations already in
/// the field were produced with this bound, so it is kept until agronomy
/// confirms the intended value.
pub fn stage_for_elapsed(elapsed: u32, cycle: &GrowthCycle) -> GrowthStage {
    // ---
    if elapsed <= cycle.initial {
        GrowthStage::Initial
    } else if elapsed <= cycle.initial + cycle.development {
        GrowthStage::Development
    } else if elapsed <= cycle.initial + cycle.initial + cycle.development + cycle.mid_season {
        GrowthStage::MidSeason
    } else {
        GrowthStage::LateSeason
    }
}

/// Estimate the growth stage of `crop` sown in `sowing_month` as of `now`.
///
/// An unknown crop, or one without a growth cycle, is reported as
/// [`GrowthStage::Initial`] with a warning.
pub fn estimate_stage(
    tables: &ReferenceTables,
    crop: &str,
    sowing_month: &str,
    now: DateTime<Utc>,
) -> Result<GrowthStage, GrowthError> {
    // ---
    let sowing = parse_month(sowing_month)?;
    let elapsed = months_since_sowing(sowing, now.month());

    if !tables.knows_crop(crop) {
        tracing::warn!("Crop coefficients not found for crop: {}", crop);
        return Ok(GrowthStage::Initial);
    }

    let Some(cycle) = tables.growth_cycle(crop) else {
        tracing::warn!("Growth cycle duration not defined for crop: {}", crop);
        return Ok(GrowthStage::Initial);
    };

    let stage = stage_for_elapsed(elapsed, &cycle);
    tracing::debug!(
        "Growth stage for {}: {} (months since sowing: {})",
        crop,
        stage,
        elapsed
    );
    Ok(stage)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn at_month(month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, 15, 12, 0, 0).unwrap()
    }

    const WHEAT: GrowthCycle = GrowthCycle {
        initial: 1,
        development: 2,
        mid_season: 3,
        late_season: 1,
    };

    #[test]
    fn test_parse_month_names() {
        // ---
        assert_eq!(parse_month("January").unwrap(), 1);
        assert_eq!(parse_month("november").unwrap(), 11);
        assert_eq!(parse_month(" Dec ").unwrap(), 12);
        assert_eq!(
            parse_month("Smarch"),
            Err(GrowthError::InvalidSowingMonth("Smarch".to_string()))
        );
        assert!(parse_month("").is_err());
    }

    #[test]
    fn test_elapsed_months_bounded() {
        // ---
        for sowing in 1..=12 {
            for current in 1..=12 {
                let elapsed = months_since_sowing(sowing, current);
                assert!(elapsed <= 11, "{} -> {} gave {}", sowing, current, elapsed);
            }
        }
    }

    #[test]
    fn test_elapsed_months_across_year_boundary() {
        // ---
        assert_eq!(months_since_sowing(11, 1), 2);
        assert_eq!(months_since_sowing(11, 12), 1);
        assert_eq!(months_since_sowing(12, 1), 1);
        assert_eq!(months_since_sowing(1, 1), 0);
        assert_eq!(months_since_sowing(2, 1), 11);
    }

    #[test]
    fn test_stage_thresholds() {
        // ---
        assert_eq!(stage_for_elapsed(0, &WHEAT), GrowthStage::Initial);
        assert_eq!(stage_for_elapsed(1, &WHEAT), GrowthStage::Initial);
        assert_eq!(stage_for_elapsed(2, &WHEAT), GrowthStage::Development);
        assert_eq!(stage_for_elapsed(3, &WHEAT), GrowthStage::Development);
        assert_eq!(stage_for_elapsed(4, &WHEAT), GrowthStage::MidSeason);
        assert_eq!(stage_for_elapsed(6, &WHEAT), GrowthStage::MidSeason);
        assert_eq!(stage_for_elapsed(8, &WHEAT), GrowthStage::LateSeason);
    }

    #[test]
    fn test_mid_season_bound_counts_initial_twice() {
        // ---
        // 1 + 2 + 3 = 6 would end mid-season; the bound is 1 + 1 + 2 + 3 = 7.
        assert_eq!(stage_for_elapsed(7, &WHEAT), GrowthStage::MidSeason);
    }

    #[test]
    fn test_estimate_stage_for_known_crop() {
        // ---
        let tables = ReferenceTables::embedded().unwrap();
        // Sown in November, now February: 3 months in.
        let stage = estimate_stage(&tables, "Wheat", "November", at_month(2)).unwrap();
        assert_eq!(stage, GrowthStage::Development);
    }

    #[test]
    fn test_estimate_stage_unknown_crop_defaults_to_initial() {
        // ---
        let tables = ReferenceTables::embedded().unwrap();
        let stage = estimate_stage(&tables, "Quinoa", "March", at_month(9)).unwrap();
        assert_eq!(stage, GrowthStage::Initial);
    }

    #[test]
    fn test_estimate_stage_without_cycle_defaults_to_initial() {
        // ---
        let crops = r#"{ "crop_coefficients": { "millet": { "initial": 0.4 } } }"#;
        let tables = ReferenceTables::from_json(crops, "{}").unwrap();
        let stage = estimate_stage(&tables, "millet", "January", at_month(10)).unwrap();
        assert_eq!(stage, GrowthStage::Initial);
    }

    #[test]
    fn test_estimate_stage_invalid_month_fails() {
        // ---
        let tables = ReferenceTables::embedded().unwrap();
        let err = estimate_stage(&tables, "Wheat", "Brumaire", at_month(2)).unwrap_err();
        assert_eq!(err, GrowthError::InvalidSowingMonth("Brumaire".to_string()));
    }
}
