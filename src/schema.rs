//! Database schema management for `irrigation-advisor`.
//!
//! Ensures the document-store tables exist before serving requests.
//! Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the schema if it does not exist (idempotent).
///
/// Mirrors the hierarchical document store: users own fields, each field
/// has at most one recommendation, and cached weather is keyed by location
/// only.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Metadata columns are nullable: the UI may write a partial document
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fields (
            user_id          TEXT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
            field_id         TEXT NOT NULL,
            name             TEXT,
            location         TEXT,
            soil_type        TEXT,
            crop_name        TEXT,
            month_of_sowing  TEXT,
            area             TEXT,
            created_at       TIMESTAMPTZ,
            PRIMARY KEY (user_id, field_id)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recommendations (
            user_id                        TEXT NOT NULL,
            field_id                       TEXT NOT NULL,
            irrigation_per_square_meter    TEXT NOT NULL,
            total_water_to_release_liters  TEXT NOT NULL,
            total_time_to_release          TEXT NOT NULL,
            growth_stage                   TEXT NOT NULL,
            crop_coefficient               DOUBLE PRECISION NOT NULL,
            computed_at                    TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (user_id, field_id),
            FOREIGN KEY (user_id, field_id)
                REFERENCES fields (user_id, field_id) ON DELETE CASCADE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cached_weather_data (
            location     TEXT PRIMARY KEY,
            temperature  DOUBLE PRECISION NOT NULL,
            humidity     DOUBLE PRECISION NOT NULL,
            pressure     DOUBLE PRECISION NOT NULL,
            windspeed    DOUBLE PRECISION NOT NULL,
            rain         DOUBLE PRECISION NOT NULL,
            captured_at  TIMESTAMPTZ NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
