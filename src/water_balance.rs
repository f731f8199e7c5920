//! Water balance and reference evapotranspiration.
//!
//! FAO-56 Penman form with two simplifications: soil heat flux is zero and
//! net radiation is a fixed constant rather than a modelled value.

use serde::Serialize;

use crate::models::{CachedWeather, Recommendation, SoilParameters};

// ---

/// Fixed constants of the water balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterBalanceConstants {
    // ---
    /// Net radiation, MJ/m²/day.
    pub net_radiation: f64,
    /// Multiplier applied to the field area to reach litres. The UI records
    /// area in acres and 4047 is m² per acre.
    pub area_conversion_factor: f64,
    /// Pump delivery in litres per minute.
    pub pump_flow_rate: f64,
}

impl Default for WaterBalanceConstants {
    fn default() -> Self {
        Self {
            net_radiation: 20.0,
            area_conversion_factor: 4047.0,
            pump_flow_rate: 950.0,
        }
    }
}

/// Full-precision intermediate and final terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaterBalance {
    // ---
    pub saturation_vapor_pressure: f64,
    pub actual_vapor_pressure: f64,
    pub vapor_pressure_slope: f64,
    pub psychrometric_constant: f64,
    pub et0: f64,
    pub etc: f64,
    pub soil_moisture_deficit: f64,
    pub irrigation_per_square_meter: f64,
    pub total_water_liters: f64,
    pub pump_hours: f64,
}

/// Compute the water balance for one field.
///
/// The irrigation requirement is not clamped: a negative value means the
/// root zone holds more than field capacity and no water is needed.
pub fn water_balance(
    moisture_fraction: f64,
    weather: &CachedWeather,
    soil: &SoilParameters,
    crop_coefficient: f64,
    area: f64,
    constants: &WaterBalanceConstants,
) -> WaterBalance {
    // ---
    let t = weather.temperature;
    let rh = weather.humidity;
    let wind = weather.windspeed;
    let soil_heat_flux = 0.0;

    let svp = 0.6108 * ((17.27 * t) / (t + 237.3)).exp();
    let avp = svp * (rh / 100.0);
    let delta = (4098.0 * svp) / (t + 237.3).powi(2);
    let gamma = 0.000665 * weather.pressure;

    let et0 = (0.408 * delta * (constants.net_radiation - soil_heat_flux)
        + gamma * (900.0 / (t + 273.0)) * wind * (svp - avp))
        / (delta + gamma * (1.0 + 0.34 * wind));
    let etc = crop_coefficient * et0;

    let smd = (soil.field_capacity_fraction - moisture_fraction) * soil.root_zone_depth_mm;
    let irrigation = etc - weather.rain + smd;
    let total_water = irrigation * area * constants.area_conversion_factor;
    let pump_hours = (total_water / constants.pump_flow_rate) / 60.0;

    WaterBalance {
        saturation_vapor_pressure: svp,
        actual_vapor_pressure: avp,
        vapor_pressure_slope: delta,
        psychrometric_constant: gamma,
        et0,
        etc,
        soil_moisture_deficit: smd,
        irrigation_per_square_meter: irrigation,
        total_water_liters: total_water,
        pump_hours,
    }
}

impl WaterBalance {
    // ---
    /// Round the outputs to two decimals.
    pub fn recommendation(&self) -> Recommendation {
        Recommendation {
            irrigation_per_square_meter: format!("{:.2}", self.irrigation_per_square_meter),
            total_water_to_release_liters: format!("{:.2}", self.total_water_liters),
            total_time_to_release: format!("{:.2}", self.pump_hours),
        }
    }
}

/// Compute a recommendation for one field.
pub fn compute(
    moisture_fraction: f64,
    weather: &CachedWeather,
    soil: &SoilParameters,
    crop_coefficient: f64,
    area: f64,
    constants: &WaterBalanceConstants,
) -> Recommendation {
    water_balance(moisture_fraction, weather, soil, crop_coefficient, area, constants)
        .recommendation()
}
