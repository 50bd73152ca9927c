use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{campaign::CampaignError, generator::GenerationError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Campaign not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Generation failed: {0}")]
    Generation(#[source] GenerationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::InvalidRequest(msg) => ApiError::InvalidRequest(msg),
            other => ApiError::Generation(other),
        }
    }
}

impl From<CampaignError> for ApiError {
    fn from(e: CampaignError) -> Self {
        match e {
            CampaignError::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
            CampaignError::NothingSelected => ApiError::InvalidRequest("No variants selected".into()),
            CampaignError::UnknownVariant(id) => ApiError::NotFound(format!("variant {id}")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {what}")),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Generation(e) => {
                tracing::error!("❌ Generation error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate variants".to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!("❌ Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
