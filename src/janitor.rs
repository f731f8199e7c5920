//! Scheduled reclamation of expired weather cache records.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::store::WeatherCacheBackend;

// ---

/// Outcome of one janitor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JanitorReport {
    // ---
    pub scanned: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Deletes cached weather older than the TTL.
pub struct CacheJanitor {
    backend: Arc<dyn WeatherCacheBackend>,
    ttl: Duration,
}

impl CacheJanitor {
    // ---
    pub fn new(backend: Arc<dyn WeatherCacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Delete every record whose age exceeds the TTL at `now`.
    ///
    /// A failed delete is logged and recorded; the sweep moves on. Only
    /// failing to list the cache aborts the run.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<JanitorReport, StoreError> {
        // ---
        tracing::info!("Weather cache cleanup started");
        let records = self.backend.list().await?;
        let mut report = JanitorReport {
            scanned: records.len(),
            ..Default::default()
        };

        for record in records.into_iter().filter(|r| now - r.captured_at > self.ttl) {
            match self.backend.delete(&record.location).await {
                Ok(()) => {
                    tracing::info!("Deleted expired cached weather for {}", record.location);
                    report.deleted.push(record.location);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to delete cached weather for {}: {}",
                        record.location,
                        e
                    );
                    report.failed.push(record.location);
                }
            }
        }

        tracing::info!(
            "Weather cache cleanup finished: {} scanned, {} deleted, {} failed",
            report.scanned,
            report.deleted.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::CachedWeather;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn record(location: &str, captured_at: DateTime<Utc>) -> CachedWeather {
        // ---
        CachedWeather {
            location: location.to_string(),
            temperature: 20.0,
            humidity: 60.0,
            pressure: 100.0,
            windspeed: 1.0,
            rain: 0.0,
            captured_at,
        }
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_expired() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let store = Arc::new(MemoryStore::new());
        store.store(&record("Ajmer", now - Duration::hours(5))).await.unwrap();
        store.store(&record("Jaipur", now - Duration::hours(1))).await.unwrap();
        store.store(&record("Kota", now - Duration::seconds(7200))).await.unwrap();

        let janitor = CacheJanitor::new(store.clone(), Duration::seconds(7200));
        let report = janitor.sweep(now).await.unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.deleted, vec!["Ajmer"]);
        assert!(report.failed.is_empty());
        assert_eq!(store.cached_locations(), vec!["Jaipur", "Kota"]);
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_stop_sweep() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let store = Arc::new(MemoryStore::new());
        store.store(&record("Ajmer", now - Duration::days(1))).await.unwrap();
        store.store(&record("Bikaner", now - Duration::days(1))).await.unwrap();
        store.fail_deletes_for("Ajmer");

        let janitor = CacheJanitor::new(store.clone(), Duration::seconds(7200));
        let report = janitor.sweep(now).await.unwrap();

        assert_eq!(report.deleted, vec!["Bikaner"]);
        assert_eq!(report.failed, vec!["Ajmer"]);
        assert_eq!(store.cached_locations(), vec!["Ajmer"]);
    }
}
