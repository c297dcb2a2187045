//! Allocation error taxonomy.

use epg_sku::{BrandPrefix, CategoryPrefix, SkuError};
use thiserror::Error;

use crate::db::DbError;

/// Reasons an allocation or validation request is rejected.
///
/// None of these are retried inside the allocator; the caller decides
/// whether to retry the whole create or update.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The category or brand has no registered short code.
    #[error("no {kind} prefix registered for '{name}'")]
    UnknownPrefix { kind: &'static str, name: String },

    /// The candidate SKU does not match the grammar.
    #[error("malformed SKU '{sku}': {source}")]
    MalformedSku {
        sku: String,
        #[source]
        source: SkuError,
    },

    /// A manually supplied SKU is already held by another instance.
    #[error("SKU '{sku}' is already assigned to another instance")]
    DuplicateSku { sku: String },

    /// A freshly generated SKU is already held by an instance.
    #[error("generated SKU '{sku}' collides with an existing instance")]
    SkuCollision { sku: String },

    /// Reset was requested for a pair that has never issued a number.
    #[error("no sequence exists for {category_prefix}/{brand_prefix}")]
    SequenceNotFound {
        category_prefix: CategoryPrefix,
        brand_prefix: BrandPrefix,
    },

    /// Auto-generation is switched off and no SKU was supplied.
    #[error("SKU auto-generation is disabled; supply a SKU manually")]
    AutoGenerationDisabled,

    #[error(transparent)]
    Store(#[from] DbError),
}

impl AllocationError {
    /// Stable machine-readable code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownPrefix { .. } => "unknown_prefix",
            Self::MalformedSku { .. } => "malformed_sku",
            Self::DuplicateSku { .. } => "duplicate_sku",
            Self::SkuCollision { .. } => "sku_collision",
            Self::SequenceNotFound { .. } => "sequence_not_found",
            Self::AutoGenerationDisabled => "auto_generation_disabled",
            Self::Store(_) => "storage_error",
        }
    }

    /// Returns true if the failure is the caller's input rather than the system.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
