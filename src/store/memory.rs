//! In-memory document store.
//!
//! Backs the store traits with ordered maps so sweeps are deterministic.
//! Individual writes and deletes can be made to fail to exercise the
//! engine's partial-failure handling.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::models::{CachedWeather, FieldInfo, StoredRecommendation};
use crate::store::{FieldRepository, RecommendationRepository, WeatherCacheBackend};

// ---

type FieldKey = (String, String);

#[derive(Debug, Default)]
struct Inner {
    // ---
    users: BTreeMap<String, BTreeMap<String, Option<FieldInfo>>>,
    recommendations: BTreeMap<FieldKey, StoredRecommendation>,
    weather: BTreeMap<String, CachedWeather>,
    failing_writes: HashSet<FieldKey>,
    failing_deletes: HashSet<String>,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: &str) {
        self.inner
            .write()
            .users
            .entry(user_id.to_string())
            .or_default();
    }

    /// Add a field with metadata, creating the user if needed.
    pub fn add_field(&self, user_id: &str, field_id: &str, info: FieldInfo) {
        self.inner
            .write()
            .users
            .entry(user_id.to_string())
            .or_default()
            .insert(field_id.to_string(), Some(info));
    }

    /// Add a field whose metadata document was never written.
    pub fn add_bare_field(&self, user_id: &str, field_id: &str) {
        self.inner
            .write()
            .users
            .entry(user_id.to_string())
            .or_default()
            .insert(field_id.to_string(), None);
    }

    /// Make every recommendation write for this field fail.
    pub fn fail_writes_for(&self, user_id: &str, field_id: &str) {
        self.inner
            .write()
            .failing_writes
            .insert((user_id.to_string(), field_id.to_string()));
    }

    /// Make deleting this location's cached weather fail.
    pub fn fail_deletes_for(&self, location: &str) {
        self.inner
            .write()
            .failing_deletes
            .insert(location.to_string());
    }

    pub fn cached_locations(&self) -> Vec<String> {
        self.inner.read().weather.keys().cloned().collect()
    }
}

#[async_trait]
impl FieldRepository for MemoryStore {
    // ---
    async fn list_users(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.read().users.keys().cloned().collect())
    }

    async fn list_fields(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .read()
            .users
            .get(user_id)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn field_info(
        &self,
        user_id: &str,
        field_id: &str,
    ) -> Result<Option<FieldInfo>, StoreError> {
        Ok(self
            .inner
            .read()
            .users
            .get(user_id)
            .and_then(|fields| fields.get(field_id))
            .cloned()
            .flatten())
    }
}

#[async_trait]
impl RecommendationRepository for MemoryStore {
    // ---
    async fn save_recommendation(
        &self,
        user_id: &str,
        field_id: &str,
        recommendation: &StoredRecommendation,
    ) -> Result<(), StoreError> {
        // ---
        let key = (user_id.to_string(), field_id.to_string());
        let mut inner = self.inner.write();
        if inner.failing_writes.contains(&key) {
            return Err(StoreError::Unavailable(format!(
                "write rejected for {}/{}",
                user_id, field_id
            )));
        }
        inner.recommendations.insert(key, recommendation.clone());
        Ok(())
    }

    async fn recommendation(
        &self,
        user_id: &str,
        field_id: &str,
    ) -> Result<Option<StoredRecommendation>, StoreError> {
        Ok(self
            .inner
            .read()
            .recommendations
            .get(&(user_id.to_string(), field_id.to_string()))
            .cloned())
    }
}

#[async_trait]
impl WeatherCacheBackend for MemoryStore {
    // ---
    async fn load(&self, location: &str) -> Result<Option<CachedWeather>, StoreError> {
        Ok(self.inner.read().weather.get(location).cloned())
    }

    async fn store(&self, record: &CachedWeather) -> Result<(), StoreError> {
        self.inner
            .write()
            .weather
            .insert(record.location.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CachedWeather>, StoreError> {
        Ok(self.inner.read().weather.values().cloned().collect())
    }

    async fn delete(&self, location: &str) -> Result<(), StoreError> {
        // ---
        let mut inner = self.inner.write();
        if inner.failing_deletes.contains(location) {
            return Err(StoreError::Unavailable(format!(
                "delete rejected for {}",
                location
            )));
        }
        inner.weather.remove(location);
        Ok(())
    }
}
