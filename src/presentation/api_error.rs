// Error responses for HTTP handlers
use crate::application::transform_service::TransformUpdateError;
use crate::domain::transform::TransformError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("{0}")]
    BadRequest(String),

    #[error("backend request failed: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl From<TransformUpdateError> for ApiError {
    fn from(err: TransformUpdateError) -> Self {
        match err {
            TransformUpdateError::Invalid(e) => ApiError::Transform(e),
            TransformUpdateError::Unavailable(e) => ApiError::Backend(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Transform(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(e) => {
                tracing::error!("Backend error: {:#}", e);
                StatusCode::BAD_GATEWAY
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transform::TransformField;

    #[test]
    fn test_transform_update_error_status() {
        let invalid: ApiError = TransformUpdateError::Invalid(TransformError::NotFinite {
            field: TransformField::GasOffset,
        })
        .into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let unavailable: ApiError =
            TransformUpdateError::Unavailable(anyhow::anyhow!("settings store unavailable")).into();
        assert_eq!(unavailable.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
