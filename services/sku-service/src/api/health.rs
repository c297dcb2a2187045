//! Health check endpoints.
//!
//! Used by load balancers and orchestration systems to decide whether the
//! service should receive traffic.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

const SERVICE_NAME: &str = "sku-service";

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    pub service: String,
    pub version: String,
    /// ISO 8601.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentHealth>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ComponentHealth {
    /// Backing store for sequence counters and instances.
    pub storage: ComponentStatus,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ComponentStatus {
    /// "ok" or "unavailable".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(livez))
}

fn response(status: &str, components: Option<ComponentHealth>) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        components,
    }
}

/// Returns 200 while the process is serving. Dependencies are not checked.
async fn healthz() -> impl IntoResponse {
    Json(response("ok", None))
}

/// Returns 503 when the database is unreachable.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let storage = match state.db() {
        Some(db) => match db.health_check().await {
            Ok(()) => ComponentStatus {
                status: "ok".to_string(),
                message: None,
            },
            Err(e) => ComponentStatus {
                status: "unavailable".to_string(),
                message: Some(e.to_string()),
            },
        },
        None => ComponentStatus {
            status: "ok".to_string(),
            message: Some("in-memory storage".to_string()),
        },
    };

    let ready = storage.status == "ok";
    let body = response(
        if ready { "ok" } else { "degraded" },
        Some(ComponentHealth { storage }),
    );

    if ready {
        (StatusCode::OK, Json(body))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(body))
    }
}

async fn livez() -> impl IntoResponse {
    StatusCode::OK
}
