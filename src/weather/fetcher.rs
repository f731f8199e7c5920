//! Fetch-on-miss for the weather cache.
//!
//! Pressure is cached in kPa, converted from the hPa the API reports, so
//! the psychrometric constant is computed on the unit it expects.
//! Recommendations computed before this conversion used raw hPa and are
//! not comparable with current ones.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::WeatherError;
use crate::models::CachedWeather;
use crate::weather::cache::WeatherCache;
use crate::weather::client::{ForecastStep, WeatherApi};

// ---

/// Forecast steps inspected for near-term rain.
const RAIN_LOOKAHEAD_STEPS: usize = 2;

/// First non-zero 3-hour rain among the leading forecast steps, else 0.
pub fn near_term_rain(steps: &[ForecastStep]) -> f64 {
    steps
        .iter()
        .take(RAIN_LOOKAHEAD_STEPS)
        .filter_map(|step| step.rain_3h)
        .find(|rain| *rain != 0.0)
        .unwrap_or(0.0)
}

/// Fetches weather into the cache, at most one fetch per location at a time.
pub struct WeatherFetcher {
    api: Arc<dyn WeatherApi>,
    cache: WeatherCache,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl WeatherFetcher {
    // ---
    pub fn new(api: Arc<dyn WeatherApi>, cache: WeatherCache) -> Self {
        Self {
            api,
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    /// Fetch current conditions and the forecast, then cache the snapshot.
    ///
    /// Nothing is cached when either call fails.
    pub async fn fetch(
        &self,
        location: &str,
        now: DateTime<Utc>,
    ) -> Result<CachedWeather, WeatherError> {
        // ---
        let current = self.api.current(location).await?;
        let forecast = self
            .api
            .forecast(current.latitude, current.longitude)
            .await?;

        let record = CachedWeather {
            location: location.to_string(),
            temperature: current.temperature,
            humidity: current.humidity,
            // hPa -> kPa
            pressure: current.pressure_hpa / 10.0,
            windspeed: current.wind_speed,
            rain: near_term_rain(&forecast),
            captured_at: now,
        };

        self.cache.put(&record).await?;
        tracing::info!("Weather data fetched and cached for {}", location);
        Ok(record)
    }

    /// Cached weather for `location`, fetching it on a miss.
    ///
    /// Concurrent callers for the same location wait for the first fetch and
    /// then read its result from the cache.
    pub async fn resolve(
        &self,
        location: &str,
        now: DateTime<Utc>,
    ) -> Result<CachedWeather, WeatherError> {
        // ---
        if let Some(record) = self.cache.get(location, now).await? {
            return Ok(record);
        }

        let lock = self.location_lock(location);
        let result = {
            let _guard = lock.lock().await;
            match self.cache.get(location, now).await {
                Ok(Some(record)) => Ok(record),
                Ok(None) => {
                    tracing::info!("No usable cached weather for {}, fetching", location);
                    self.fetch(location, now).await
                }
                Err(e) => Err(e.into()),
            }
        };
        self.release_location_lock(location, &lock);
        result
    }

    fn location_lock(&self, location: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .entry(location.to_string())
            .or_default()
            .clone()
    }

    fn release_location_lock(&self, location: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        // ---
        let mut in_flight = self.in_flight.lock();
        // Registry entry plus our handle: nobody else is waiting
        if Arc::strong_count(lock) == 2 {
            in_flight.remove(location);
        }
    }
}
