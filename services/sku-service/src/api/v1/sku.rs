//! SKU admin endpoints.
//!
//! Reset and the auto-generation switch change allocation for every caller.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use epg_sku::{normalize, BrandPrefix, CategoryPrefix, Sku};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::db::SequenceCounter;
use crate::ids::InstanceId;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/preview", get(preview))
        .route("/statistics", get(statistics))
        .route("/validate", post(validate))
        .route("/sequences", get(list_sequences))
        .route(
            "/sequences/{category_prefix}/{brand_prefix}/reset",
            post(reset_sequence),
        )
        .route(
            "/auto-generation",
            get(get_auto_generation).put(set_auto_generation),
        )
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub category_prefix: String,
    pub brand_prefix: String,
}

/// A rendered SKU with its decoded parts.
#[derive(Debug, Serialize)]
pub struct SkuResponse {
    pub sku: Sku,
    pub category_prefix: CategoryPrefix,
    pub brand_prefix: BrandPrefix,
    pub sequence: u64,
}

impl From<Sku> for SkuResponse {
    fn from(sku: Sku) -> Self {
        Self {
            category_prefix: sku.category(),
            brand_prefix: sku.brand(),
            sequence: sku.sequence(),
            sku,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub sku: String,
    /// Instance being edited; its own SKU does not count as a duplicate.
    #[serde(default)]
    pub exclude_instance_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(flatten)]
    pub sku: SkuResponse,
}

#[derive(Debug, Serialize)]
pub struct ListSequencesResponse {
    pub items: Vec<SequenceCounter>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub category_prefix: CategoryPrefix,
    pub brand_prefix: BrandPrefix,
    pub last_issued: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutoGeneration {
    pub enabled: bool,
}

// =============================================================================
// Handlers
// =============================================================================

fn parse_prefixes(
    category: &str,
    brand: &str,
    request_id: &str,
) -> Result<(CategoryPrefix, BrandPrefix), ApiError> {
    let invalid = |e: epg_sku::SkuError| {
        ApiError::bad_request("invalid_prefix", e.to_string()).with_request_id(request_id)
    };
    let category = CategoryPrefix::parse(&normalize(category)).map_err(invalid)?;
    let brand = BrandPrefix::parse(&normalize(brand)).map_err(invalid)?;
    Ok((category, brand))
}

/// GET /v1/sku/preview
async fn preview(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (category, brand) =
        parse_prefixes(&query.category_prefix, &query.brand_prefix, &ctx.request_id)?;

    let sku = state
        .admin()
        .preview(category, brand)
        .await
        .map_err(|e| ApiError::from_allocation(&e, &ctx.request_id))?;

    Ok(Json(SkuResponse::from(sku)))
}

/// GET /v1/sku/statistics
async fn statistics(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .admin()
        .statistics()
        .await
        .map_err(|e| ApiError::from_allocation(&e, &ctx.request_id))?;

    Ok(Json(stats))
}

/// POST /v1/sku/validate
async fn validate(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let exclude = req
        .exclude_instance_id
        .as_deref()
        .map(str::parse::<InstanceId>)
        .transpose()
        .map_err(|e| {
            ApiError::bad_request("invalid_instance_id", e.to_string())
                .with_request_id(&ctx.request_id)
        })?;

    let sku = state
        .admin()
        .validate(&req.sku, exclude.as_ref())
        .await
        .map_err(|e| ApiError::from_allocation(&e, &ctx.request_id))?;

    Ok(Json(ValidateResponse {
        valid: true,
        sku: SkuResponse::from(sku),
    }))
}

/// GET /v1/sku/sequences
async fn list_sequences(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .admin()
        .list_sequences()
        .await
        .map_err(|e| ApiError::from_allocation(&e, &ctx.request_id))?;

    let total = items.len();
    Ok(Json(ListSequencesResponse { items, total }))
}

/// POST /v1/sku/sequences/{category_prefix}/{brand_prefix}/reset
async fn reset_sequence(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((category_prefix, brand_prefix)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (category, brand) = parse_prefixes(&category_prefix, &brand_prefix, &ctx.request_id)?;

    tracing::info!(
        request_id = %ctx.request_id,
        category_prefix = %category,
        brand_prefix = %brand,
        "Sequence reset requested"
    );

    state
        .admin()
        .reset_sequence(category, brand)
        .await
        .map_err(|e| ApiError::from_allocation(&e, &ctx.request_id))?;

    Ok(Json(ResetResponse {
        category_prefix: category,
        brand_prefix: brand,
        last_issued: 0,
    }))
}

/// GET /v1/sku/auto-generation
async fn get_auto_generation(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let enabled = state
        .admin()
        .auto_generation_enabled()
        .await
        .map_err(|e| ApiError::from_allocation(&e, &ctx.request_id))?;

    Ok(Json(AutoGeneration { enabled }))
}

/// PUT /v1/sku/auto-generation
async fn set_auto_generation(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(req): Json<AutoGeneration>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .admin()
        .set_auto_generation(req.enabled)
        .await
        .map_err(|e| ApiError::from_allocation(&e, &ctx.request_id))?;

    Ok(Json(AutoGeneration {
        enabled: req.enabled,
    }))
}
