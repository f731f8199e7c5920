//! Fan-out of a sensor reading over every field of every user.
//!
//! Each field is processed on its own: a failure leaves that field's
//! previous recommendation in place and the sweep moves on to the next one.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{SkipReason, StoreError};
use crate::growth;
use crate::models::{SensorReading, StoredRecommendation};
use crate::reference::ReferenceTables;
use crate::store::{FieldRepository, RecommendationRepository};
use crate::water_balance::{self, WaterBalanceConstants};
use crate::weather::WeatherFetcher;

// ---

/// Result for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldStatus {
    Updated { recommendation: StoredRecommendation },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
    // ---
    pub user_id: String,
    pub field_id: String,
    pub result: FieldStatus,
}

/// A user whose fields could not be listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserFailure {
    pub user_id: String,
    pub error: String,
}

/// Aggregated outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    // ---
    pub sweep_id: Uuid,
    pub moisture_fraction: f64,
    pub updated: usize,
    pub skipped: usize,
    /// Set when the user list itself could not be read.
    pub aborted: Option<String>,
    pub user_failures: Vec<UserFailure>,
    pub outcomes: Vec<FieldOutcome>,
}

impl SweepReport {
    // ---
    fn new(moisture_fraction: f64) -> Self {
        Self {
            sweep_id: Uuid::new_v4(),
            moisture_fraction,
            updated: 0,
            skipped: 0,
            aborted: None,
            user_failures: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    fn record(&mut self, user_id: &str, field_id: &str, result: FieldStatus) {
        // ---
        match result {
            FieldStatus::Updated { .. } => self.updated += 1,
            FieldStatus::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push(FieldOutcome {
            user_id: user_id.to_string(),
            field_id: field_id.to_string(),
            result,
        });
    }

    /// Outcome for one field, if it was visited.
    pub fn outcome(&self, user_id: &str, field_id: &str) -> Option<&FieldStatus> {
        self.outcomes
            .iter()
            .find(|o| o.user_id == user_id && o.field_id == field_id)
            .map(|o| &o.result)
    }
}

/// Outcome of a scheduled weather refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    // ---
    pub locations: usize,
    pub fresh: usize,
    pub fetched: usize,
    pub failed: Vec<String>,
}

/// Applies the recommendation pipeline to every field.
pub struct Orchestrator {
    fields: Arc<dyn FieldRepository>,
    recommendations: Arc<dyn RecommendationRepository>,
    weather: Arc<WeatherFetcher>,
    reference: Arc<ReferenceTables>,
    constants: WaterBalanceConstants,
}

impl Orchestrator {
    // ---
    pub fn new(
        fields: Arc<dyn FieldRepository>,
        recommendations: Arc<dyn RecommendationRepository>,
        weather: Arc<WeatherFetcher>,
        reference: Arc<ReferenceTables>,
        constants: WaterBalanceConstants,
    ) -> Self {
        Self {
            fields,
            recommendations,
            weather,
            reference,
            constants,
        }
    }

    /// Recompute every field's recommendation for a new sensor reading.
    pub async fn on_sensor_value_changed(
        &self,
        reading: SensorReading,
        now: DateTime<Utc>,
    ) -> SweepReport {
        // ---
        let mut report = SweepReport::new(reading.moisture_fraction());
        let span = tracing::info_span!("sweep", sweep_id = %report.sweep_id);

        async {
            tracing::info!(
                "Moisture reading {} (fraction {:.4}), starting sweep",
                reading.raw,
                report.moisture_fraction
            );
            self.sweep(&mut report, reading, now).await;
            tracing::info!(
                "Sweep finished: {} updated, {} skipped",
                report.updated,
                report.skipped
            );
        }
        .instrument(span)
        .await;

        report
    }

    async fn sweep(&self, report: &mut SweepReport, reading: SensorReading, now: DateTime<Utc>) {
        // ---
        let users = match self.fields.list_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("Failed to list users: {}", e);
                report.aborted = Some(e.to_string());
                return;
            }
        };

        for user_id in users {
            tracing::debug!("Processing user: {}", user_id);
            let field_ids = match self.fields.list_fields(&user_id).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::error!("Failed to list fields for user {}: {}", user_id, e);
                    report.user_failures.push(UserFailure {
                        user_id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for field_id in field_ids {
                let span = tracing::debug_span!("field", user_id = %user_id, field_id = %field_id);
                let result = match self
                    .process_field(&user_id, &field_id, reading, now)
                    .instrument(span)
                    .await
                {
                    Ok(recommendation) => {
                        tracing::info!(
                            "Recommendation updated for user {}, field {}: {:?}",
                            user_id,
                            field_id,
                            recommendation.recommendation
                        );
                        FieldStatus::Updated { recommendation }
                    }
                    Err(reason) => {
                        log_skip(&user_id, &field_id, &reason);
                        FieldStatus::Skipped { reason }
                    }
                };
                report.record(&user_id, &field_id, result);
            }
        }
    }

    /// Compute and persist one field's recommendation.
    async fn process_field(
        &self,
        user_id: &str,
        field_id: &str,
        reading: SensorReading,
        now: DateTime<Utc>,
    ) -> Result<StoredRecommendation, SkipReason> {
        // ---
        let info = self
            .fields
            .field_info(user_id, field_id)
            .await
            .map_err(|e| SkipReason::StoreRead(e.to_string()))?
            .ok_or(SkipReason::FieldInfoMissing)?;
        let profile = info.profile()?;

        let weather = self
            .weather
            .resolve(&profile.location, now)
            .await
            .map_err(|e| SkipReason::WeatherUnavailable(e.to_string()))?;

        let stage = growth::estimate_stage(
            &self.reference,
            &profile.crop_name,
            &profile.month_of_sowing,
            now,
        )?;
        let soil = self.reference.soil(&profile.soil_type);
        let kc = self.reference.crop_coefficient(&profile.crop_name, stage);

        let recommendation = water_balance::compute(
            reading.moisture_fraction(),
            &weather,
            &soil,
            kc,
            profile.area,
            &self.constants,
        );

        let stored = StoredRecommendation {
            recommendation,
            growth_stage: stage,
            crop_coefficient: kc,
            computed_at: now,
        };

        self.recommendations
            .save_recommendation(user_id, field_id, &stored)
            .await
            .map_err(|e| SkipReason::StoreWrite(e.to_string()))?;

        Ok(stored)
    }

    /// Make sure every field location has fresh cached weather.
    ///
    /// Locations are de-duplicated across all users; a failed location is
    /// recorded and the rest are still refreshed.
    pub async fn refresh_weather(&self, now: DateTime<Utc>) -> Result<RefreshReport, StoreError> {
        // ---
        let mut locations = BTreeSet::new();
        for user_id in self.fields.list_users().await? {
            let field_ids = match self.fields.list_fields(&user_id).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::error!("Failed to list fields for user {}: {}", user_id, e);
                    continue;
                }
            };
            for field_id in field_ids {
                match self.fields.field_info(&user_id, &field_id).await {
                    Ok(Some(info)) => {
                        if let Some(location) = info.location.filter(|l| !l.trim().is_empty()) {
                            locations.insert(location.trim().to_string());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::error!(
                        "Failed to read field info for user {}, field {}: {}",
                        user_id,
                        field_id,
                        e
                    ),
                }
            }
        }

        tracing::info!("Refreshing weather for {} unique locations", locations.len());
        let mut report = RefreshReport {
            locations: locations.len(),
            ..Default::default()
        };

        for location in locations {
            if let Ok(Some(_)) = self.weather.cache().get(&location, now).await {
                report.fresh += 1;
                continue;
            }
            match self.weather.resolve(&location, now).await {
                Ok(_) => report.fetched += 1,
                Err(e) => {
                    tracing::error!("Error fetching weather for {}: {}", location, e);
                    report.failed.push(location);
                }
            }
        }

        Ok(report)
    }
}

fn log_skip(user_id: &str, field_id: &str, reason: &SkipReason) {
    // ---
    match reason {
        SkipReason::InvalidSowingMonth(_) => {
            tracing::warn!("Skipping user {}, field {}: {}", user_id, field_id, reason)
        }
        _ => tracing::error!("Skipping user {}, field {}: {}", user_id, field_id, reason),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::error::WeatherError;
    use crate::models::{CachedWeather, FieldInfo};
    use crate::store::{MemoryStore, WeatherCacheBackend};
    use crate::weather::{CurrentConditions, ForecastStep, WeatherApi, WeatherCache};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    struct DownApi;

    #[async_trait]
    impl WeatherApi for DownApi {
        async fn current(&self, _location: &str) -> Result<CurrentConditions, WeatherError> {
            Err(WeatherError::Status {
                status: 503,
                body: "down".to_string(),
            })
        }

        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<Vec<ForecastStep>, WeatherError> {
            Err(WeatherError::Status {
                status: 503,
                body: "down".to_string(),
            })
        }
    }

    fn orchestrator(store: Arc<MemoryStore>) -> Orchestrator {
        // ---
        let cache = WeatherCache::new(store.clone(), Duration::seconds(7200));
        let fetcher = Arc::new(WeatherFetcher::new(Arc::new(DownApi), cache));
        Orchestrator::new(
            store.clone(),
            store,
            fetcher,
            Arc::new(ReferenceTables::embedded().unwrap()),
            WaterBalanceConstants::default(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_bare_field_skipped() {
        // ---
        let store = Arc::new(MemoryStore::new());
        store.add_bare_field("u1", "f1");

        let reading = SensorReading::new(500.0, 1024.0).unwrap();
        let report = orchestrator(store).on_sensor_value_changed(reading, now()).await;

        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.outcome("u1", "f1"),
            Some(&FieldStatus::Skipped {
                reason: SkipReason::FieldInfoMissing
            })
        );
    }

    #[tokio::test]
    async fn test_weather_failure_skips_field() {
        // ---
        let store = Arc::new(MemoryStore::new());
        store.add_field(
            "u1",
            "f1",
            FieldInfo {
                location: Some("Ajmer".into()),
                soil_type: Some("Loamy".into()),
                crop_name: Some("Wheat".into()),
                month_of_sowing: Some("November".into()),
                area: Some("1".into()),
                ..Default::default()
            },
        );

        let reading = SensorReading::new(500.0, 1024.0).unwrap();
        let report = orchestrator(store.clone())
            .on_sensor_value_changed(reading, now())
            .await;

        assert_eq!(report.updated, 0);
        assert!(matches!(
            report.outcome("u1", "f1"),
            Some(FieldStatus::Skipped {
                reason: SkipReason::WeatherUnavailable(_)
            })
        ));
        assert!(store.recommendation("u1", "f1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_counts_failures() {
        // ---
        let store = Arc::new(MemoryStore::new());
        for (field, location) in [("f1", "Ajmer"), ("f2", "Ajmer"), ("f3", "Kota")] {
            store.add_field(
                "u1",
                field,
                FieldInfo {
                    location: Some(location.into()),
                    ..Default::default()
                },
            );
        }

        let report = orchestrator(store).refresh_weather(now()).await.unwrap();
        assert_eq!(report.locations, 2);
        assert_eq!(report.fetched, 0);
        assert_eq!(report.failed, vec!["Ajmer", "Kota"]);
    }

    #[test]
    fn test_report_serializes_status_tag() {
        // ---
        let mut report = SweepReport::new(0.5);
        report.record(
            "u1",
            "f1",
            FieldStatus::Skipped {
                reason: SkipReason::MissingAttribute("area"),
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["skipped"], 1);
        assert_eq!(json["outcomes"][0]["result"]["status"], "skipped");
        assert_eq!(json["outcomes"][0]["result"]["reason"]["kind"], "missing_attribute");
    }

    fn wheat_field(month: &str) -> FieldInfo {
        // ---
        FieldInfo {
            location: Some("Ajmer".into()),
            soil_type: Some("Loamy".into()),
            crop_name: Some("Wheat".into()),
            month_of_sowing: Some(month.into()),
            area: Some("2".into()),
            ..Default::default()
        }
    }

    async fn seed_weather(store: &MemoryStore) {
        // ---
        let record = CachedWeather {
            location: "Ajmer".to_string(),
            temperature: 22.0,
            humidity: 45.0,
            pressure: 100.8,
            windspeed: 1.5,
            rain: 0.0,
            captured_at: now(),
        };
        store.store(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_month_skips_only_that_field() {
        // ---
        let store = Arc::new(MemoryStore::new());
        seed_weather(&store).await;
        store.add_field("u1", "f1", wheat_field("Smarch"));
        store.add_field("u1", "f2", wheat_field("November"));

        let reading = SensorReading::new(700.0, 1024.0).unwrap();
        let report = orchestrator(store.clone())
            .on_sensor_value_changed(reading, now())
            .await;

        assert_eq!(report.updated, 1);
        assert_eq!(
            report.outcome("u1", "f1"),
            Some(&FieldStatus::Skipped {
                reason: SkipReason::InvalidSowingMonth("Smarch".into())
            })
        );
        // November to January: two months in, development stage
        let stored = store.recommendation("u1", "f2").await.unwrap().unwrap();
        assert_eq!(stored.growth_stage, crate::models::GrowthStage::Development);
        assert_eq!(stored.computed_at, now());
    }

    #[tokio::test]
    async fn test_write_failure_isolated() {
        // ---
        let store = Arc::new(MemoryStore::new());
        seed_weather(&store).await;
        store.add_field("u1", "f1", wheat_field("November"));
        store.add_field("u2", "f1", wheat_field("November"));
        store.fail_writes_for("u1", "f1");

        let reading = SensorReading::new(700.0, 1024.0).unwrap();
        let report = orchestrator(store.clone())
            .on_sensor_value_changed(reading, now())
            .await;

        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert!(matches!(
            report.outcome("u1", "f1"),
            Some(FieldStatus::Skipped {
                reason: SkipReason::StoreWrite(_)
            })
        ));
        assert!(store.recommendation("u2", "f1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_area_skipped() {
        // ---
        let store = Arc::new(MemoryStore::new());
        seed_weather(&store).await;
        let mut info = wheat_field("November");
        info.area = Some("two acres".into());
        store.add_field("u1", "f1", info);

        let reading = SensorReading::new(700.0, 1024.0).unwrap();
        let report = orchestrator(store).on_sensor_value_changed(reading, now()).await;
        assert_eq!(
            report.outcome("u1", "f1"),
            Some(&FieldStatus::Skipped {
                reason: SkipReason::InvalidArea("two acres".into())
            })
        );
    }
}
