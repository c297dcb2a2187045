use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::allocator::AllocationError;
use crate::lifecycle::EquipmentError;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub code: String,
    pub request_id: String,
    pub retryable: bool,
}

impl ProblemDetails {
    fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        let code = code.into();
        let title = status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string();
        Self {
            r#type: format!("/problems/{code}"),
            title,
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            code,
            request_id: "unknown".to_string(),
            retryable: false,
        }
    }

    fn set_request_id(&mut self, request_id: impl Into<String>) {
        let request_id = request_id.into();
        self.request_id = request_id.clone();
        if self.instance.is_none() {
            self.instance = Some(request_id);
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub problem: Box<ProblemDetails>,
}

impl ApiError {
    fn with_status(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        let problem = Box::new(ProblemDetails::new(status, code, message));
        Self { status, problem }
    }

    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, code, message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, code, message)
    }

    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.problem.set_request_id(request_id);
        self
    }

    fn retryable(mut self) -> Self {
        self.problem.retryable = true;
        self
    }

    /// Maps an allocation failure onto a problem response.
    pub fn from_allocation(e: &AllocationError, request_id: &str) -> Self {
        let code = e.code();
        let error = match e {
            AllocationError::UnknownPrefix { .. }
            | AllocationError::MalformedSku { .. }
            | AllocationError::AutoGenerationDisabled => Self::bad_request(code, e.to_string()),
            AllocationError::DuplicateSku { .. } => Self::conflict(code, e.to_string()),
            // A fresh attempt reserves a new number, so retrying can succeed.
            AllocationError::SkuCollision { .. } => Self::conflict(code, e.to_string()).retryable(),
            AllocationError::SequenceNotFound { .. } => Self::not_found(code, e.to_string()),
            AllocationError::Store(inner) => {
                tracing::error!(error = %inner, request_id = %request_id, "Storage failure");
                Self::internal("internal_error", "SKU storage is unavailable").retryable()
            }
        };
        error.with_request_id(request_id)
    }

    pub fn from_equipment(e: &EquipmentError, request_id: &str) -> Self {
        match e {
            EquipmentError::Allocation(inner) => Self::from_allocation(inner, request_id),
            EquipmentError::NotFound(id) => Self::not_found(
                "instance_not_found",
                format!("Equipment instance {id} not found"),
            )
            .with_request_id(request_id),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.problem)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}
