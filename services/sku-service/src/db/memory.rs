//! In-memory implementation of all stores.
//!
//! Atomicity here comes from a process-local mutex, which only holds within
//! a single process. Use it for tests and local development, never for a
//! deployment with more than one replica.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use epg_sku::{BrandPrefix, CategoryPrefix};

use super::{DbError, EquipmentInstance, EquipmentStore, SequenceCounter, SequenceStore, SettingsStore};
use crate::ids::InstanceId;

const SKU_CONSTRAINT: &str = "equipment_instances_sku_key";

struct MemoryState {
    sequences: BTreeMap<(CategoryPrefix, BrandPrefix), SequenceCounter>,
    instances: HashMap<InstanceId, EquipmentInstance>,
    auto_generation_enabled: bool,
}

/// Mutex-guarded store implementing every storage trait.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_bookkeeping: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                sequences: BTreeMap::new(),
                instances: HashMap::new(),
                auto_generation_enabled: true,
            }),
            fail_bookkeeping: AtomicBool::new(false),
        }
    }

    /// Makes `mark_used` fail, to exercise best-effort bookkeeping paths.
    pub fn fail_bookkeeping(&self, fail: bool) {
        self.fail_bookkeeping.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SequenceStore for MemoryStore {
    async fn next_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<u64, DbError> {
        let now = Utc::now();
        let mut state = self.lock();
        let counter = state
            .sequences
            .entry((category, brand))
            .or_insert_with(|| SequenceCounter {
                category_prefix: category,
                brand_prefix: brand,
                last_issued: 0,
                last_used: None,
                created_at: now,
                updated_at: now,
            });
        counter.last_issued += 1;
        counter.updated_at = now;
        Ok(counter.last_issued)
    }

    async fn peek_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<u64, DbError> {
        Ok(self
            .lock()
            .sequences
            .get(&(category, brand))
            .map(|counter| counter.last_issued)
            .unwrap_or(0))
    }

    async fn reset_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<bool, DbError> {
        let mut state = self.lock();
        match state.sequences.get_mut(&(category, brand)) {
            Some(counter) => {
                counter.last_issued = 0;
                counter.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_sequences(&self) -> Result<Vec<SequenceCounter>, DbError> {
        Ok(self.lock().sequences.values().cloned().collect())
    }

    async fn mark_used(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<(), DbError> {
        if self.fail_bookkeeping.load(Ordering::SeqCst) {
            return Err(DbError::Query(sqlx::Error::PoolTimedOut));
        }

        if let Some(counter) = self.lock().sequences.get_mut(&(category, brand)) {
            counter.last_used = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl EquipmentStore for MemoryStore {
    async fn sku_in_use(&self, sku: &str, exclude: Option<&InstanceId>) -> Result<bool, DbError> {
        Ok(self
            .lock()
            .instances
            .values()
            .any(|instance| instance.sku == sku && Some(&instance.instance_id) != exclude))
    }

    async fn insert(&self, instance: &EquipmentInstance) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.instances.values().any(|i| i.sku == instance.sku) {
            return Err(DbError::UniqueViolation {
                constraint: SKU_CONSTRAINT.to_string(),
            });
        }
        if state.instances.contains_key(&instance.instance_id) {
            return Err(DbError::UniqueViolation {
                constraint: "equipment_instances_pkey".to_string(),
            });
        }
        state
            .instances
            .insert(instance.instance_id, instance.clone());
        Ok(())
    }

    async fn get(&self, instance_id: &InstanceId) -> Result<Option<EquipmentInstance>, DbError> {
        Ok(self.lock().instances.get(instance_id).cloned())
    }

    async fn update_sku(
        &self,
        instance_id: &InstanceId,
        sku: &str,
    ) -> Result<Option<EquipmentInstance>, DbError> {
        let mut state = self.lock();
        if state
            .instances
            .values()
            .any(|i| i.sku == sku && &i.instance_id != instance_id)
        {
            return Err(DbError::UniqueViolation {
                constraint: SKU_CONSTRAINT.to_string(),
            });
        }

        Ok(state.instances.get_mut(instance_id).map(|instance| {
            instance.sku = sku.to_string();
            instance.updated_at = Utc::now();
            instance.clone()
        }))
    }

    async fn count(&self) -> Result<u64, DbError> {
        Ok(self.lock().instances.len() as u64)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn auto_generation_enabled(&self) -> Result<bool, DbError> {
        Ok(self.lock().auto_generation_enabled)
    }

    async fn set_auto_generation(&self, enabled: bool) -> Result<(), DbError> {
        self.lock().auto_generation_enabled = enabled;
        Ok(())
    }
}
