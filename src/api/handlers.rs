use axum::extract::State;
use axum::Json;
use crate::api::dto::{FrameRequest, HealthResponse, ReadyResponse};
use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::helper::posture_classifier::PostureVerdict;

/// classify_frame serves `POST /` and `POST /api/v1/posture`.
pub async fn classify_frame(
    State(state): State<AppState>,
    Json(request): Json<FrameRequest>,
) -> Result<Json<PostureVerdict>, ApiError> {
    let verdict = state
        .pipeline
        .classify_posture_with_timeout(&request.image, state.request_timeout)
        .await?;
    Ok(Json(verdict))
}

/// health reports process liveness without touching the detector.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        detector: state.pipeline.landmark_source().name().to_string(),
    })
}

/// ready asks the landmark source whether it can serve frames.
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, ApiError> {
    let source = state.pipeline.landmark_source();
    let detector = source.name().to_string();

    match tokio::time::timeout(state.request_timeout, source.ready()).await {
        Ok(Ok(true)) => Ok(Json(ReadyResponse { ready: true, detector })),
        Ok(Ok(false)) => Err(ApiError::NotReady(detector)),
        Ok(Err(err)) => {
            tracing::warn!(detector = %detector, error = %format!("{err:#}"), "readiness check failed");
            Err(ApiError::NotReady(detector))
        }
        Err(_) => {
            tracing::warn!(detector = %detector, "readiness check timed out");
            Err(ApiError::NotReady(detector))
        }
    }
}
