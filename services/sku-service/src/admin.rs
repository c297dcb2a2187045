//! Administrative operations over the allocator and its stores.
//!
//! Everything here is a pass-through; the invariants live in the sequence
//! store and the allocator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use epg_sku::{BrandPrefix, CategoryPrefix, Sku, SkuFormat};
use serde::Serialize;
use tracing::{info, warn};

use crate::allocator::{AllocationError, SkuAllocator};
use crate::db::SequenceCounter;
use crate::ids::InstanceId;

/// Totals for one category or brand prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefixStatistics {
    /// Number of counters that use this prefix.
    pub sequences: usize,
    /// Sum of `last_issued` over those counters.
    pub issued: u64,
    pub last_used: Option<DateTime<Utc>>,
}

impl PrefixStatistics {
    fn add(&mut self, counter: &SequenceCounter) {
        self.sequences += 1;
        self.issued = self.issued.saturating_add(counter.last_issued);
        self.last_used = self.last_used.max(counter.last_used);
    }
}

/// Aggregate view over all sequence counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkuStatistics {
    pub total_sequences: usize,
    pub total_issued: u64,
    pub total_instances: u64,
    /// Counters whose last number no longer fits the padded width.
    pub widened_sequences: usize,
    pub last_used: Option<DateTime<Utc>>,
    pub auto_generation_enabled: bool,
    pub sequence_width: usize,
    pub by_category: BTreeMap<CategoryPrefix, PrefixStatistics>,
    pub by_brand: BTreeMap<BrandPrefix, PrefixStatistics>,
}

impl SkuStatistics {
    pub fn from_counters(
        counters: &[SequenceCounter],
        format: &SkuFormat,
        total_instances: u64,
        auto_generation_enabled: bool,
    ) -> Self {
        let mut by_category: BTreeMap<CategoryPrefix, PrefixStatistics> = BTreeMap::new();
        let mut by_brand: BTreeMap<BrandPrefix, PrefixStatistics> = BTreeMap::new();

        for counter in counters {
            by_category
                .entry(counter.category_prefix)
                .or_default()
                .add(counter);
            by_brand.entry(counter.brand_prefix).or_default().add(counter);
        }

        Self {
            total_sequences: counters.len(),
            total_issued: counters
                .iter()
                .fold(0u64, |total, c| total.saturating_add(c.last_issued)),
            total_instances,
            widened_sequences: counters
                .iter()
                .filter(|c| format.is_widened(c.last_issued))
                .count(),
            last_used: counters.iter().filter_map(|c| c.last_used).max(),
            auto_generation_enabled,
            sequence_width: format.sequence_width(),
            by_category,
            by_brand,
        }
    }
}

/// Admin operations exposed to the HTTP layer.
#[derive(Clone)]
pub struct SkuAdmin {
    allocator: SkuAllocator,
}

impl SkuAdmin {
    pub fn new(allocator: SkuAllocator) -> Self {
        Self { allocator }
    }

    pub async fn preview(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<Sku, AllocationError> {
        self.allocator.preview_sku(category, brand).await
    }

    pub async fn validate(
        &self,
        candidate: &str,
        exclude: Option<&InstanceId>,
    ) -> Result<Sku, AllocationError> {
        self.allocator.validate_manual_sku(candidate, exclude).await
    }

    pub async fn list_sequences(&self) -> Result<Vec<SequenceCounter>, AllocationError> {
        Ok(self.allocator.sequences().list_sequences().await?)
    }

    pub async fn statistics(&self) -> Result<SkuStatistics, AllocationError> {
        let counters = self.allocator.sequences().list_sequences().await?;
        let total_instances = self.allocator.equipment().count().await?;
        let enabled = self.allocator.settings().auto_generation_enabled().await?;

        Ok(SkuStatistics::from_counters(
            &counters,
            self.allocator.format(),
            total_instances,
            enabled,
        ))
    }

    /// Sets a counter back to zero. Destructive; callers gate on privilege.
    pub async fn reset_sequence(
        &self,
        category: CategoryPrefix,
        brand: BrandPrefix,
    ) -> Result<(), AllocationError> {
        let reset = self
            .allocator
            .sequences()
            .reset_sequence(category, brand)
            .await?;

        if !reset {
            return Err(AllocationError::SequenceNotFound {
                category_prefix: category,
                brand_prefix: brand,
            });
        }

        warn!(
            category_prefix = %category,
            brand_prefix = %brand,
            "Sequence counter reset to zero"
        );
        Ok(())
    }

    pub async fn auto_generation_enabled(&self) -> Result<bool, AllocationError> {
        Ok(self.allocator.settings().auto_generation_enabled().await?)
    }

    pub async fn set_auto_generation(&self, enabled: bool) -> Result<(), AllocationError> {
        self.allocator.settings().set_auto_generation(enabled).await?;
        info!(enabled, "SKU auto-generation toggled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::allocator::{EquipmentDraft, PrefixResolver};
    use crate::db::{MemoryStore, SequenceStore, Stores};

    fn admin() -> (SkuAdmin, SkuAllocator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let allocator = SkuAllocator::new(
            SkuFormat::default(),
            PrefixResolver::builtin(),
            &Stores::memory(store.clone()),
        );
        (SkuAdmin::new(allocator.clone()), allocator, store)
    }

    fn counter(category: &str, brand: &str, issued: u64, used_mins_ago: Option<i64>) -> SequenceCounter {
        let now = Utc::now();
        SequenceCounter {
            category_prefix: CategoryPrefix::parse(category).unwrap(),
            brand_prefix: BrandPrefix::parse(brand).unwrap(),
            last_issued: issued,
            last_used: used_mins_ago.map(|m| now - Duration::minutes(m)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_statistics_aggregation() {
        let counters = vec![
            counter("AUD", "SHR", 5, Some(30)),
            counter("LGT", "CHV", 12, Some(5)),
            counter("LGT", "MRT", 10_001, None),
        ];
        let stats = SkuStatistics::from_counters(&counters, &SkuFormat::default(), 9, true);

        assert_eq!(stats.total_sequences, 3);
        assert_eq!(stats.total_issued, 10_018);
        assert_eq!(stats.total_instances, 9);
        assert_eq!(stats.widened_sequences, 1);
        assert_eq!(stats.last_used, counters[1].last_used);
        assert_eq!(stats.sequence_width, 4);

        let lighting = &stats.by_category[&CategoryPrefix::parse("LGT").unwrap()];
        assert_eq!(lighting.sequences, 2);
        assert_eq!(lighting.issued, 10_013);
        assert_eq!(lighting.last_used, counters[1].last_used);

        let shure = &stats.by_brand[&BrandPrefix::parse("SHR").unwrap()];
        assert_eq!(shure.sequences, 1);
        assert_eq!(shure.issued, 5);
    }

    #[test]
    fn test_statistics_totals_saturate() {
        let counters = vec![
            counter("LGT", "CHV", u64::MAX - 1, None),
            counter("LGT", "MRT", 5, None),
        ];
        let stats = SkuStatistics::from_counters(&counters, &SkuFormat::default(), 0, true);

        assert_eq!(stats.total_issued, u64::MAX);
        let lighting = &stats.by_category[&CategoryPrefix::parse("LGT").unwrap()];
        assert_eq!(lighting.issued, u64::MAX);
        assert_eq!(stats.widened_sequences, 2);
    }

    #[test]
    fn test_statistics_empty() {
        let stats = SkuStatistics::from_counters(&[], &SkuFormat::default(), 0, false);
        assert_eq!(stats.total_sequences, 0);
        assert_eq!(stats.last_used, None);
        assert!(!stats.auto_generation_enabled);
        assert!(stats.by_category.is_empty());
    }

    #[tokio::test]
    async fn test_reset_unknown_pair() {
        let (admin, _, _) = admin();
        let err = admin
            .reset_sequence(
                CategoryPrefix::parse("LGT").unwrap(),
                BrandPrefix::parse("CHV").unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::SequenceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_reset_known_pair() {
        let (admin, allocator, store) = admin();
        let draft = EquipmentDraft {
            category: "Lighting".to_string(),
            brand: "Chauvet".to_string(),
            sku: None,
        };
        allocator.generate_sku(&draft, false).await.unwrap();
        allocator.generate_sku(&draft, false).await.unwrap();

        let lgt = CategoryPrefix::parse("LGT").unwrap();
        let chv = BrandPrefix::parse("CHV").unwrap();
        admin.reset_sequence(lgt, chv).await.unwrap();

        assert_eq!(store.next_sequence(lgt, chv).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_toggle_auto_generation() {
        let (admin, _, _) = admin();
        assert!(admin.auto_generation_enabled().await.unwrap());
        admin.set_auto_generation(false).await.unwrap();
        assert!(!admin.auto_generation_enabled().await.unwrap());
        assert!(!admin.statistics().await.unwrap().auto_generation_enabled);
    }

    #[tokio::test]
    async fn test_statistics_reflect_allocations() {
        let (admin, allocator, _) = admin();
        let draft = EquipmentDraft {
            category: "Audio".to_string(),
            brand: "Shure".to_string(),
            sku: None,
        };
        for _ in 0..3 {
            allocator.generate_sku(&draft, false).await.unwrap();
        }

        let stats = admin.statistics().await.unwrap();
        assert_eq!(stats.total_sequences, 1);
        assert_eq!(stats.total_issued, 3);
        // Reserved numbers without persisted instances.
        assert_eq!(stats.total_instances, 0);

        let sequences = admin.list_sequences().await.unwrap();
        assert_eq!(sequences[0].last_issued, 3);
    }
}
