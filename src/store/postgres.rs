//! PostgreSQL implementation of the store ports.
//!
//! Tables are created by [`crate::schema::create_schema`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::{CachedWeather, FieldInfo, GrowthStage, Recommendation, StoredRecommendation};
use crate::store::{FieldRepository, RecommendationRepository, WeatherCacheBackend};

// ---

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecommendationRow {
    // ---
    irrigation_per_square_meter: String,
    total_water_to_release_liters: String,
    total_time_to_release: String,
    growth_stage: String,
    crop_coefficient: f64,
    computed_at: DateTime<Utc>,
}

impl TryFrom<RecommendationRow> for StoredRecommendation {
    type Error = StoreError;

    fn try_from(row: RecommendationRow) -> Result<Self, Self::Error> {
        // ---
        let growth_stage = GrowthStage::parse(&row.growth_stage).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown growth stage '{}'", row.growth_stage))
        })?;

        Ok(StoredRecommendation {
            recommendation: Recommendation {
                irrigation_per_square_meter: row.irrigation_per_square_meter,
                total_water_to_release_liters: row.total_water_to_release_liters,
                total_time_to_release: row.total_time_to_release,
            },
            growth_stage,
            crop_coefficient: row.crop_coefficient,
            computed_at: row.computed_at,
        })
    }
}

#[async_trait]
impl FieldRepository for PgStore {
    // ---
    async fn list_users(&self) -> Result<Vec<String>, StoreError> {
        let users = sqlx::query_scalar::<_, String>("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_fields(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let fields = sqlx::query_scalar::<_, String>(
            "SELECT field_id FROM fields WHERE user_id = $1 ORDER BY field_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fields)
    }

    async fn field_info(
        &self,
        user_id: &str,
        field_id: &str,
    ) -> Result<Option<FieldInfo>, StoreError> {
        // ---
        let info = sqlx::query_as::<_, FieldInfo>(
            r#"
            SELECT name, location, soil_type, crop_name, month_of_sowing, area, created_at
            FROM fields
            WHERE user_id = $1 AND field_id = $2
            "#,
        )
        .bind(user_id)
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(info)
    }
}

#[async_trait]
impl RecommendationRepository for PgStore {
    // ---
    async fn save_recommendation(
        &self,
        user_id: &str,
        field_id: &str,
        recommendation: &StoredRecommendation,
    ) -> Result<(), StoreError> {
        // ---
        let values = &recommendation.recommendation;
        sqlx::query(
            r#"
            INSERT INTO recommendations (
                user_id, field_id,
                irrigation_per_square_meter, total_water_to_release_liters,
                total_time_to_release, growth_stage, crop_coefficient, computed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, field_id) DO UPDATE SET
                irrigation_per_square_meter   = EXCLUDED.irrigation_per_square_meter,
                total_water_to_release_liters = EXCLUDED.total_water_to_release_liters,
                total_time_to_release         = EXCLUDED.total_time_to_release,
                growth_stage                  = EXCLUDED.growth_stage,
                crop_coefficient              = EXCLUDED.crop_coefficient,
                computed_at                   = EXCLUDED.computed_at
            "#,
        )
        .bind(user_id)
        .bind(field_id)
        .bind(&values.irrigation_per_square_meter)
        .bind(&values.total_water_to_release_liters)
        .bind(&values.total_time_to_release)
        .bind(recommendation.growth_stage.as_str())
        .bind(recommendation.crop_coefficient)
        .bind(recommendation.computed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recommendation(
        &self,
        user_id: &str,
        field_id: &str,
    ) -> Result<Option<StoredRecommendation>, StoreError> {
        // ---
        let row = sqlx::query_as::<_, RecommendationRow>(
            r#"
            SELECT irrigation_per_square_meter, total_water_to_release_liters,
                   total_time_to_release, growth_stage, crop_coefficient, computed_at
            FROM recommendations
            WHERE user_id = $1 AND field_id = $2
            "#,
        )
        .bind(user_id)
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredRecommendation::try_from).transpose()
    }
}

#[async_trait]
impl WeatherCacheBackend for PgStore {
    // ---
    async fn load(&self, location: &str) -> Result<Option<CachedWeather>, StoreError> {
        // ---
        let record = sqlx::query_as::<_, CachedWeather>(
            r#"
            SELECT location, temperature, humidity, pressure, windspeed, rain, captured_at
            FROM cached_weather_data
            WHERE location = $1
            "#,
        )
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn store(&self, record: &CachedWeather) -> Result<(), StoreError> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO cached_weather_data (
                location, temperature, humidity, pressure, windspeed, rain, captured_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (location) DO UPDATE SET
                temperature = EXCLUDED.temperature,
                humidity    = EXCLUDED.humidity,
                pressure    = EXCLUDED.pressure,
                windspeed   = EXCLUDED.windspeed,
                rain        = EXCLUDED.rain,
                captured_at = EXCLUDED.captured_at
            "#,
        )
        .bind(&record.location)
        .bind(record.temperature)
        .bind(record.humidity)
        .bind(record.pressure)
        .bind(record.windspeed)
        .bind(record.rain)
        .bind(record.captured_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<CachedWeather>, StoreError> {
        // ---
        let records = sqlx::query_as::<_, CachedWeather>(
            r#"
            SELECT location, temperature, humidity, pressure, windspeed, rain, captured_at
            FROM cached_weather_data
            ORDER BY location
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn delete(&self, location: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cached_weather_data WHERE location = $1")
            .bind(location)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
