//! Document-store ports used by the engine.
//!
//! The engine only talks to these traits; `postgres` backs them in
//! production and `memory` backs them in tests.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{CachedWeather, FieldInfo, StoredRecommendation};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ---

/// Read access to users and their field metadata.
#[async_trait]
pub trait FieldRepository: Send + Sync {
    // ---
    async fn list_users(&self) -> Result<Vec<String>, StoreError>;

    async fn list_fields(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    /// `None` when the field has no metadata document.
    async fn field_info(
        &self,
        user_id: &str,
        field_id: &str,
    ) -> Result<Option<FieldInfo>, StoreError>;
}

/// Recommendation documents, one per field, replaced on every write.
#[async_trait]
pub trait RecommendationRepository: Send + Sync {
    // ---
    async fn save_recommendation(
        &self,
        user_id: &str,
        field_id: &str,
        recommendation: &StoredRecommendation,
    ) -> Result<(), StoreError>;

    async fn recommendation(
        &self,
        user_id: &str,
        field_id: &str,
    ) -> Result<Option<StoredRecommendation>, StoreError>;
}

/// Key-value backend of the weather cache, keyed by location.
///
/// Expiry is not this layer's concern: it stores and returns whatever was
/// written.
#[async_trait]
pub trait WeatherCacheBackend: Send + Sync {
    // ---
    async fn load(&self, location: &str) -> Result<Option<CachedWeather>, StoreError>;

    /// Replace the whole record for `record.location`.
    async fn store(&self, record: &CachedWeather) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<CachedWeather>, StoreError>;

    async fn delete(&self, location: &str) -> Result<(), StoreError>;
}
