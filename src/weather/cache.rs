//! Location-keyed weather cache with a fixed time-to-live.
//!
//! Lookups only compare ages; an expired record stays in the backend until
//! the janitor reclaims it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;
use crate::models::CachedWeather;
use crate::store::WeatherCacheBackend;

// ---

/// Default time-to-live, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 7200;

/// Weather cache shared by every user and field.
#[derive(Clone)]
pub struct WeatherCache {
    backend: Arc<dyn WeatherCacheBackend>,
    ttl: Duration,
}

impl WeatherCache {
    // ---
    pub fn new(backend: Arc<dyn WeatherCacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A record is valid while `now - captured_at <= ttl`.
    pub fn is_fresh(&self, record: &CachedWeather, now: DateTime<Utc>) -> bool {
        now - record.captured_at <= self.ttl
    }

    /// The cached record for `location`, if present and unexpired.
    pub async fn get(
        &self,
        location: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CachedWeather>, StoreError> {
        // ---
        match self.backend.load(location).await? {
            Some(record) if self.is_fresh(&record, now) => {
                tracing::debug!("Returning cached weather for {}", location);
                Ok(Some(record))
            }
            Some(_) => {
                tracing::debug!("Cached weather for {} is expired", location);
                Ok(None)
            }
            None => {
                tracing::debug!("No cached weather for {}", location);
                Ok(None)
            }
        }
    }

    /// Replace whatever is cached for `record.location`.
    pub async fn put(&self, record: &CachedWeather) -> Result<(), StoreError> {
        self.backend.store(record).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn record(location: &str, captured_at: DateTime<Utc>) -> CachedWeather {
        // ---
        CachedWeather {
            location: location.to_string(),
            temperature: 25.0,
            humidity: 50.0,
            pressure: 101.0,
            windspeed: 2.0,
            rain: 0.0,
            captured_at,
        }
    }

    fn cache() -> (Arc<MemoryStore>, WeatherCache) {
        // ---
        let store = Arc::new(MemoryStore::new());
        let cache = WeatherCache::new(store.clone(), Duration::seconds(DEFAULT_TTL_SECS));
        (store, cache)
    }

    #[tokio::test]
    async fn test_get_after_put() {
        // ---
        let (_, cache) = cache();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let rec = record("Ajmer", now);

        cache.put(&rec).await.unwrap();
        assert_eq!(cache.get("Ajmer", now).await.unwrap(), Some(rec));
        assert_eq!(cache.get("Jaipur", now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        // ---
        let (_, cache) = cache();
        let captured = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        cache.put(&record("Ajmer", captured)).await.unwrap();

        let at_ttl = captured + Duration::seconds(DEFAULT_TTL_SECS);
        assert!(cache.get("Ajmer", at_ttl).await.unwrap().is_some());

        let past_ttl = at_ttl + Duration::seconds(1);
        assert!(cache.get("Ajmer", past_ttl).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_record_not_deleted_on_read() {
        // ---
        let (store, cache) = cache();
        let captured = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        cache.put(&record("Ajmer", captured)).await.unwrap();

        let later = captured + Duration::days(1);
        assert!(cache.get("Ajmer", later).await.unwrap().is_none());
        assert_eq!(store.cached_locations(), vec!["Ajmer"]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        // ---
        let (_, cache) = cache();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        cache.put(&record("Ajmer", now)).await.unwrap();

        let mut newer = record("Ajmer", now);
        newer.rain = 4.5;
        cache.put(&newer).await.unwrap();

        assert_eq!(cache.get("Ajmer", now).await.unwrap().unwrap().rain, 4.5);
    }
}
