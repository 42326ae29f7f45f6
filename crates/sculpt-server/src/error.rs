use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sculpt::engine::EngineError;
use sculpt::translate::TranslateError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error(transparent)]
    Translate(#[from] TranslateError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Translate(TranslateError::Engine(EngineError::ProviderNotConfigured(_))) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Translate(TranslateError::Engine(EngineError::Cancelled)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Translate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
