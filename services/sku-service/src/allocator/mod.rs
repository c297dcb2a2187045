//! SKU allocation.
//!
//! A request either carries a manual SKU, which is normalized, parsed, and
//! checked for uniqueness, or it is auto-generated:
//!
//! ```text
//! RESOLVE_PREFIXES -> RESERVE_SEQUENCE -> RENDER -> COLLISION_CHECK -> ACCEPT
//! ```
//!
//! Any failing step rejects the request immediately. Uniqueness comes from
//! the atomic sequence reservation; the collision check only catches a
//! counter that was reset or restored behind existing instances.

mod error;
mod prefixes;

pub use error::AllocationError;
pub use prefixes::{PrefixConfigError, PrefixResolver, PrefixTable, BUILTIN_PREFIXES};

use std::sync::Arc;

use epg_sku::{normalize, BrandPrefix, CategoryPrefix, Sku, SkuFormat, SkuParts};
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::{EquipmentStore, SequenceStore, SettingsStore, Stores};
use crate::ids::InstanceId;

/// The SKU-relevant fields of an equipment instance about to be written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquipmentDraft {
    pub category: String,
    pub brand: String,
    #[serde(default)]
    pub sku: Option<String>,
}

impl EquipmentDraft {
    fn manual_sku(&self) -> Option<&str> {
        self.sku.as_deref().filter(|sku| !sku.trim().is_empty())
    }
}

/// Where an accepted SKU came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkuOrigin {
    /// Issued by a sequence counter.
    Generated,
    /// Supplied by the caller.
    Manual,
}

/// An accepted SKU and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedSku {
    pub sku: Sku,
    pub origin: SkuOrigin,
}

/// Allocates and validates SKUs.
#[derive(Clone)]
pub struct SkuAllocator {
    format: SkuFormat,
    prefixes: Arc<PrefixResolver>,
    sequences: Arc<dyn SequenceStore>,
    equipment: Arc<dyn EquipmentStore>,
    settings: Arc<dyn SettingsStore>,
}

impl SkuAllocator {
    pub fn new(format: SkuFormat, prefixes: PrefixResolver, stores: &Stores) -> Self {
        Self {
            format,
            prefixes: Arc::new(prefixes),
            sequences: stores.sequences.clone(),
            equipment: stores.equipment.clone(),
            settings: stores.settings.clone(),
        }
    }

    pub fn format(&self) -> &SkuFormat {
        &self.format
    }

    pub fn prefixes(&self) -> &PrefixResolver {
        &self.prefixes
    }

    pub(crate) fn sequences(&self) -> &dyn SequenceStore {
        self.sequences.as_ref()
    }

    pub(crate) fn equipment(&self) -> &dyn EquipmentStore {
        self.equipment.as_ref()
    }

    pub(crate) fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    /// Produces the SKU for a new instance.
    ///
    /// A non-blank `draft.sku`, or `force_manual`, routes to
    /// [`validate_manual_sku`](Self::validate_manual_sku) instead of
    /// generating one.
    pub async fn generate_sku(
        &self,
        draft: &EquipmentDraft,
        force_manual: bool,
    ) -> Result<Sku, AllocationError> {
        self.allocate(draft, force_manual)
            .await
            .map(|allocated| allocated.sku)
    }

    /// Like [`generate_sku`](Self::generate_sku), also reporting whether a
    /// counter issued the SKU.
    pub async fn allocate(
        &self,
        draft: &EquipmentDraft,
        force_manual: bool,
    ) -> Result<AllocatedSku, AllocationError> {
        if force_manual || draft.manual_sku().is_some() {
            let candidate = draft.sku.as_deref().unwrap_or_default();
            let sku = self.validate_manual_sku(candidate, None).await?;
            return Ok(AllocatedSku {
                sku,
                origin: SkuOrigin::Manual,
            });
        }

        let result = self.auto_generate(draft).await;
        observe("auto", &result);
        Ok(AllocatedSku {
            sku: result?,
            origin: SkuOrigin::Generated,
        })
    }

    /// Normalizes a manual SKU and checks grammar and uniqueness.
    ///
    /// `exclude` is the instance being updated, which may keep its own SKU.
    pub async fn validate_manual_sku(
        &self,
        candidate: &str,
        exclude: Option<&InstanceId>,
    ) -> Result<Sku, AllocationError> {
        let result = self.check_manual(candidate, exclude).await;
        observe("manual", &result);
        result
    }

    /// Renders the SKU the next auto-generation for this pair would produce.
    ///
    /// Reads the counter only; nothing is reserved.
    pub async fn preview_sku(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<Sku, AllocationError> {
        let last_issued = self.sequences.peek_sequence(category, brand).await?;
        let next = last_issued.saturating_add(1);
        Ok(self.format.render(SkuParts::new(category, brand, next)))
    }

    async fn auto_generate(&self, draft: &EquipmentDraft) -> Result<Sku, AllocationError> {
        if !self.settings.auto_generation_enabled().await? {
            return Err(AllocationError::AutoGenerationDisabled);
        }

        let category = self.prefixes.resolve_category_prefix(&draft.category)?;
        let brand = self.prefixes.resolve_brand_prefix(&draft.brand)?;

        let sequence = self.sequences.next_sequence(category, brand).await?;
        if self.format.is_widened(sequence) {
            warn!(
                category_prefix = %category,
                brand_prefix = %brand,
                sequence,
                capacity = self.format.capacity(),
                "Sequence exceeded padded width, SKU widened"
            );
        }

        let sku = self.format.render(SkuParts::new(category, brand, sequence));

        if self.equipment.sku_in_use(sku.as_str(), None).await? {
            return Err(AllocationError::SkuCollision {
                sku: sku.into_string(),
            });
        }

        Ok(sku)
    }

    async fn check_manual(
        &self,
        candidate: &str,
        exclude: Option<&InstanceId>,
    ) -> Result<Sku, AllocationError> {
        let normalized = normalize(candidate);
        let sku = self
            .format
            .parse(&normalized)
            .map_err(|source| AllocationError::MalformedSku {
                sku: normalized.clone(),
                source,
            })?;

        if self.equipment.sku_in_use(sku.as_str(), exclude).await? {
            return Err(AllocationError::DuplicateSku {
                sku: sku.into_string(),
            });
        }

        Ok(sku)
    }
}

/// Records the outcome of an allocation attempt.
fn observe(mode: &'static str, result: &Result<Sku, AllocationError>) {
    match result {
        Ok(sku) => info!(mode, sku = %sku, "SKU accepted"),
        Err(e) if e.is_rejection() => {
            warn!(mode, code = e.code(), error = %e, "SKU rejected")
        }
        Err(e) => tracing::error!(mode, error = %e, "SKU allocation failed"),
    }
}
