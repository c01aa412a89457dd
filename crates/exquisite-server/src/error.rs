//! HTTP error responses

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use exquisite_core::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

pub const INVALID_ID_MESSAGE: &str = "invalid entity id";
pub const INVALID_PAYLOAD_MESSAGE: &str = "invalid request payload";

/// Error returned by every handler, rendered as `{"error": "<message>"}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn invalid_id() -> Self {
        Self::BadRequest(INVALID_ID_MESSAGE.to_string())
    }

    pub fn invalid_payload() -> Self {
        Self::BadRequest(INVALID_PAYLOAD_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Validation(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(StoreError::Connectivity(_)) | Self::Store(StoreError::Persistence(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        Self::invalid_payload()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            // Keep the driver detail in the log, not in the response
            Self::Store(StoreError::Connectivity(detail)) => {
                error!("Database unreachable: {}", detail)
            }
            Self::Store(StoreError::Persistence(detail)) => {
                error!("Database operation failed: {}", detail)
            }
            Self::Store(StoreError::NotFound(id)) => warn!("Entity {} not found", id),
            other => warn!("Bad request: {}", other),
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
