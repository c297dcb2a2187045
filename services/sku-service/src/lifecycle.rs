//! Equipment instance write path.
//!
//! The content backend calls these hooks explicitly around its writes:
//!
//! - [`before_create`] must succeed before an instance is inserted
//! - [`before_update`] must succeed before an update that touches `sku`
//! - [`after_create`] records counter bookkeeping for generated SKUs and
//!   never fails the request
//!
//! [`EquipmentWriter`] strings the hooks together with the store so a failed
//! allocation or validation never leaves a row with a missing or bad SKU.

use chrono::Utc;
use epg_sku::Sku;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::allocator::{AllocatedSku, AllocationError, EquipmentDraft, SkuAllocator, SkuOrigin};
use crate::db::{DbError, EquipmentInstance};
use crate::ids::InstanceId;

/// Partial update of an equipment instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquipmentUpdate {
    #[serde(default)]
    pub sku: Option<String>,
}

/// Errors from the equipment write path.
#[derive(Debug, Error)]
pub enum EquipmentError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("equipment instance not found: {0}")]
    NotFound(InstanceId),
}

impl From<DbError> for EquipmentError {
    fn from(e: DbError) -> Self {
        Self::Allocation(AllocationError::Store(e))
    }
}

/// Pre-persist hook: the SKU the new instance must be written with.
pub async fn before_create(
    allocator: &SkuAllocator,
    draft: &EquipmentDraft,
    force_manual: bool,
) -> Result<AllocatedSku, AllocationError> {
    allocator.allocate(draft, force_manual).await
}

/// Pre-update hook. Returns the validated SKU if the update carries one.
pub async fn before_update(
    allocator: &SkuAllocator,
    instance_id: &InstanceId,
    update: &EquipmentUpdate,
) -> Result<Option<Sku>, AllocationError> {
    match update.sku.as_deref() {
        Some(candidate) => allocator
            .validate_manual_sku(candidate, Some(instance_id))
            .await
            .map(Some),
        None => Ok(None),
    }
}

/// Post-create hook. Only generated SKUs touch the counter; failures are
/// logged and swallowed.
pub async fn after_create(
    allocator: &SkuAllocator,
    instance: &EquipmentInstance,
    origin: SkuOrigin,
) {
    if origin == SkuOrigin::Manual {
        return;
    }

    if let Err(e) = allocator
        .sequences()
        .mark_used(instance.category_prefix, instance.brand_prefix)
        .await
    {
        warn!(
            error = %e,
            instance_id = %instance.instance_id,
            sku = %instance.sku,
            "Failed to record sequence last_used"
        );
    }
}

/// Creates and updates equipment instances through the SKU hooks.
#[derive(Clone)]
pub struct EquipmentWriter {
    allocator: SkuAllocator,
}

impl EquipmentWriter {
    pub fn new(allocator: SkuAllocator) -> Self {
        Self { allocator }
    }

    pub async fn create(
        &self,
        draft: &EquipmentDraft,
        force_manual: bool,
    ) -> Result<EquipmentInstance, EquipmentError> {
        let AllocatedSku { sku, origin } =
            before_create(&self.allocator, draft, force_manual).await?;

        let now = Utc::now();
        let instance = EquipmentInstance {
            instance_id: InstanceId::new(),
            category_prefix: sku.category(),
            brand_prefix: sku.brand(),
            sku: sku.into_string(),
            category: draft.category.trim().to_string(),
            brand: draft.brand.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        self.allocator
            .equipment()
            .insert(&instance)
            .await
            .map_err(|e| conflict_error(e, &instance.sku, origin))?;

        info!(
            instance_id = %instance.instance_id,
            sku = %instance.sku,
            "Equipment instance created"
        );

        after_create(&self.allocator, &instance, origin).await;
        Ok(instance)
    }

    pub async fn update(
        &self,
        instance_id: &InstanceId,
        update: &EquipmentUpdate,
    ) -> Result<EquipmentInstance, EquipmentError> {
        let Some(sku) = before_update(&self.allocator, instance_id, update).await? else {
            return self.get(instance_id).await;
        };

        let updated = self
            .allocator
            .equipment()
            .update_sku(instance_id, sku.as_str())
            .await
            .map_err(|e| conflict_error(e, sku.as_str(), SkuOrigin::Manual))?
            .ok_or(EquipmentError::NotFound(*instance_id))?;

        info!(instance_id = %instance_id, sku = %sku, "Equipment instance SKU updated");
        Ok(updated)
    }

    pub async fn get(&self, instance_id: &InstanceId) -> Result<EquipmentInstance, EquipmentError> {
        self.allocator
            .equipment()
            .get(instance_id)
            .await?
            .ok_or(EquipmentError::NotFound(*instance_id))
    }
}

/// A unique violation at write time means another request took the SKU
/// between the uniqueness check and the write.
fn conflict_error(e: DbError, sku: &str, origin: SkuOrigin) -> EquipmentError {
    if !e.is_unique_violation() {
        return e.into();
    }

    let sku = sku.to_string();
    match origin {
        SkuOrigin::Generated => AllocationError::SkuCollision { sku },
        SkuOrigin::Manual => AllocationError::DuplicateSku { sku },
    }
    .into()
}
