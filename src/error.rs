use std::time::Duration;
use thiserror::Error;
use crate::utils::coordinate::PoseLandmark;

/// DecodeError describes why a transport payload could not be turned into a frame.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame payload is empty")]
    EmptyPayload,

    #[error("frame payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("frame bytes are not a supported image encoding")]
    UnsupportedImage,

    #[error("opencv failed to decode frame: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error("frame decoding task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// PostureError is the outcome of a posture classification that produced no verdict.
#[derive(Debug, Error)]
pub enum PostureError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no person detected in frame")]
    NoSubjectDetected,

    #[error("landmark detection is missing required keypoints: {}", join_landmarks(.0))]
    IncompleteLandmarks(Vec<PoseLandmark>),

    #[error("pose landmark model failed: {0:#}")]
    LandmarkModel(anyhow::Error),

    #[error("posture classification timed out after {0:?}")]
    Timeout(Duration),
}

impl PostureError {
    /// kind returns a stable machine-readable code for the error.
    pub fn kind(&self) -> &'static str {
        match self {
            PostureError::Decode(_) => "decode_error",
            PostureError::NoSubjectDetected => "no_subject_detected",
            PostureError::IncompleteLandmarks(_) => "incomplete_landmarks",
            PostureError::LandmarkModel(_) => "landmark_model_error",
            PostureError::Timeout(_) => "timeout",
        }
    }

    /// is_fault reports whether the error is a system fault rather than an
    /// expected outcome of a bad frame or an empty scene.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            PostureError::IncompleteLandmarks(_) | PostureError::LandmarkModel(_) | PostureError::Timeout(_)
        )
    }
}

fn join_landmarks(landmarks: &[PoseLandmark]) -> String {
    landmarks
        .iter()
        .map(|landmark| landmark.name())
        .collect::<Vec<_>>()
        .join(", ")
}
