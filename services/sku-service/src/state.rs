//! Application state shared across request handlers.

use std::sync::Arc;

use crate::admin::SkuAdmin;
use crate::allocator::SkuAllocator;
use crate::db::Database;
use crate::lifecycle::EquipmentWriter;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Option<Database>,
    admin: SkuAdmin,
    equipment: EquipmentWriter,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `db` is `None` when running on the in-memory backend.
    pub fn new(db: Option<Database>, allocator: SkuAllocator) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                admin: SkuAdmin::new(allocator.clone()),
                equipment: EquipmentWriter::new(allocator),
            }),
        }
    }

    /// Get the database, if one is configured.
    pub fn db(&self) -> Option<&Database> {
        self.inner.db.as_ref()
    }

    pub fn admin(&self) -> &SkuAdmin {
        &self.inner.admin
    }

    pub fn equipment(&self) -> &EquipmentWriter {
        &self.inner.equipment
    }
}
