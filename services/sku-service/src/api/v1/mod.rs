//! API v1 routes.

mod equipment;
mod sku;

use axum::Router;

use crate::state::AppState;

/// Create v1 API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/sku", sku::routes())
        .nest("/equipment-instances", equipment::routes())
}
