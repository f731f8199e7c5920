//! Configuration loader for the `irrigation-advisor` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller), so `env::var` calls are not scattered through the
//! engine.
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::water_balance::WaterBalanceConstants;
use crate::weather::client::DEFAULT_BASE_URL;
use crate::weather::DEFAULT_TTL_SECS;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional float environment variable with a default value.
macro_rules! parse_env_f64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// HTTP port for the trigger endpoints.
    pub listen_port: u16,

    /// Weather API key. Never logged.
    pub weather_api_key: String,

    /// Weather API base URL.
    pub weather_api_url: String,

    /// Cached weather time-to-live, seconds.
    pub weather_cache_ttl_secs: u32,

    /// Per-request timeout for weather API calls, seconds.
    pub weather_timeout_secs: u32,

    /// Upper bound of the raw moisture sensor range.
    pub sensor_max_raw: f64,

    /// Water balance constants.
    pub water_balance: WaterBalanceConstants,

    /// Optional override for the crop coefficient table.
    pub crop_coefficients_path: Option<PathBuf>,

    /// Optional override for the soil table.
    pub soil_types_path: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("db_url", &mask_db_url(&self.db_url))
            .field("db_pool_max", &self.db_pool_max)
            .field("listen_port", &self.listen_port)
            .field("weather_api_key", &"****")
            .field("weather_api_url", &self.weather_api_url)
            .field("weather_cache_ttl_secs", &self.weather_cache_ttl_secs)
            .field("weather_timeout_secs", &self.weather_timeout_secs)
            .field("sensor_max_raw", &self.sensor_max_raw)
            .field("water_balance", &self.water_balance)
            .field("crop_coefficients_path", &self.crop_coefficients_path)
            .field("soil_types_path", &self.soil_types_path)
            .finish()
    }
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `WEATHER_API_KEY` – weather API key
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `WEATHER_API_URL` – weather API base URL (default: OpenWeatherMap 2.5)
/// - `WEATHER_CACHE_TTL_SECS` – cache TTL (default: 7200)
/// - `WEATHER_TIMEOUT_SECS` – weather request timeout (default: 10)
/// - `SENSOR_MAX_RAW` – raw sensor maximum (default: 1024)
/// - `NET_RADIATION_MJ` – net radiation constant (default: 20)
/// - `AREA_CONVERSION_FACTOR` – area to litre factor (default: 4047)
/// - `PUMP_FLOW_RATE` – pump litres per minute (default: 950)
/// - `CROP_COEFFICIENTS_PATH`, `SOIL_TYPES_PATH` – reference table overrides
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let weather_api_key = require_env!("WEATHER_API_KEY");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let listen_port = u16::try_from(parse_env_u32!("LISTEN_PORT", 8080))
        .map_err(|e| anyhow!("Invalid LISTEN_PORT: {}", e))?;
    let weather_api_url =
        env::var("WEATHER_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let weather_cache_ttl_secs = parse_env_u32!("WEATHER_CACHE_TTL_SECS", DEFAULT_TTL_SECS as u32);
    let weather_timeout_secs = parse_env_u32!("WEATHER_TIMEOUT_SECS", 10);
    let sensor_max_raw = parse_env_f64!("SENSOR_MAX_RAW", 1024.0);

    let defaults = WaterBalanceConstants::default();
    let water_balance = WaterBalanceConstants {
        net_radiation: parse_env_f64!("NET_RADIATION_MJ", defaults.net_radiation),
        area_conversion_factor: parse_env_f64!(
            "AREA_CONVERSION_FACTOR",
            defaults.area_conversion_factor
        ),
        pump_flow_rate: parse_env_f64!("PUMP_FLOW_RATE", defaults.pump_flow_rate),
    };

    if !(sensor_max_raw > 0.0) {
        return Err(anyhow!("SENSOR_MAX_RAW must be positive"));
    }
    if !(water_balance.pump_flow_rate > 0.0) {
        return Err(anyhow!("PUMP_FLOW_RATE must be positive"));
    }

    Ok(Config {
        db_url,
        db_pool_max,
        listen_port,
        weather_api_key,
        weather_api_url,
        weather_cache_ttl_secs,
        weather_timeout_secs,
        sensor_max_raw,
        water_balance,
        crop_coefficients_path: env::var_os("CROP_COEFFICIENTS_PATH").map(PathBuf::from),
        soil_types_path: env::var_os("SOIL_TYPES_PATH").map(PathBuf::from),
    })
}

/// Mask the password in a database URL.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password and the weather API key.
    pub fn log_config(&self) {
        // ---
        let wb = &self.water_balance;
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL           : {}", mask_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX            : {}", self.db_pool_max);
        tracing::info!("  LISTEN_PORT            : {}", self.listen_port);
        tracing::info!("  WEATHER_API_KEY        : ****");
        tracing::info!("  WEATHER_API_URL        : {}", self.weather_api_url);
        tracing::info!("  WEATHER_CACHE_TTL_SECS : {}", self.weather_cache_ttl_secs);
        tracing::info!("  WEATHER_TIMEOUT_SECS   : {}", self.weather_timeout_secs);
        tracing::info!("  SENSOR_MAX_RAW         : {}", self.sensor_max_raw);
        tracing::info!("  NET_RADIATION_MJ       : {}", wb.net_radiation);
        tracing::info!("  AREA_CONVERSION_FACTOR : {}", wb.area_conversion_factor);
        tracing::info!("  PUMP_FLOW_RATE         : {}", wb.pump_flow_rate);
        tracing::info!("  CROP_COEFFICIENTS_PATH : {:?}", self.crop_coefficients_path);
        tracing::info!("  SOIL_TYPES_PATH        : {:?}", self.soil_types_path);
    }
}
