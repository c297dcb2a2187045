//! Equipment instance endpoints.
//!
//! Creation and SKU edits go through the allocation hooks, so a rejected
//! SKU never reaches storage.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::allocator::EquipmentDraft;
use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::ids::InstanceId;
use crate::lifecycle::EquipmentUpdate;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_instance))
        .route("/{instance_id}", get(get_instance).patch(update_instance))
}

/// Request to create an equipment instance.
#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    /// Category display name, e.g. "Lighting".
    pub category: String,
    /// Brand display name, e.g. "Chauvet".
    pub brand: String,
    /// Manual SKU; omitted or blank means auto-generate.
    #[serde(default)]
    pub sku: Option<String>,
    /// Treat `sku` as manual even when blank.
    #[serde(default)]
    pub force_manual: bool,
}

fn parse_instance_id(raw: &str, request_id: &str) -> Result<InstanceId, ApiError> {
    raw.parse::<InstanceId>().map_err(|e| {
        ApiError::bad_request("invalid_instance_id", e.to_string()).with_request_id(request_id)
    })
}

/// POST /v1/equipment-instances
async fn create_instance(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(req): Json<CreateInstanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = EquipmentDraft {
        category: req.category,
        brand: req.brand,
        sku: req.sku,
    };

    let instance = state
        .equipment()
        .create(&draft, req.force_manual)
        .await
        .map_err(|e| ApiError::from_equipment(&e, &ctx.request_id))?;

    Ok((StatusCode::CREATED, Json(instance)))
}

/// GET /v1/equipment-instances/{instance_id}
async fn get_instance(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let instance_id = parse_instance_id(&instance_id, &ctx.request_id)?;

    let instance = state
        .equipment()
        .get(&instance_id)
        .await
        .map_err(|e| ApiError::from_equipment(&e, &ctx.request_id))?;

    Ok(Json(instance))
}

/// PATCH /v1/equipment-instances/{instance_id}
async fn update_instance(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Json(update): Json<EquipmentUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let instance_id = parse_instance_id(&instance_id, &ctx.request_id)?;

    let instance = state
        .equipment()
        .update(&instance_id, &update)
        .await
        .map_err(|e| ApiError::from_equipment(&e, &ctx.request_id))?;

    Ok(Json(instance))
}
