use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use crate::api::dto::ErrorBody;
use crate::error::{DecodeError, PostureError};

/// ApiError converts classification failures into HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Posture(#[from] PostureError),

    #[error("landmark detector {0} is not ready")]
    NotReady(String),
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        ApiError::Posture(err.into())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Posture(PostureError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Posture(PostureError::NoSubjectDetected) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Posture(PostureError::IncompleteLandmarks(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Posture(PostureError::LandmarkModel(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Posture(PostureError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Posture(err) => err.kind(),
            ApiError::NotReady(_) => "not_ready",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(status = status.as_u16(), code = self.error_code(), "request failed");
        (status, Json(ErrorBody::new(self.error_code(), self.to_string()))).into_response()
    }
}
