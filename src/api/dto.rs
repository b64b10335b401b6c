//! Request and response bodies for the HTTP and websocket surfaces.

use serde::{Deserialize, Serialize};
use crate::error::PostureError;
use crate::helper::posture_classifier::PostureVerdict;

/// Body of `POST /` and `POST /api/v1/posture`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRequest {
    /// Base64 image, optionally prefixed by a `data:` URI header.
    pub image: String,
}

/// Frame data carried by a websocket `frame` event.
///
/// Clients may send the encoded image directly or wrapped as `{"image": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FramePayload {
    Encoded(String),
    Wrapped { image: String },
}

impl FramePayload {
    pub fn as_str(&self) -> &str {
        match self {
            FramePayload::Encoded(image) => image,
            FramePayload::Wrapped { image } => image,
        }
    }
}

/// Events a websocket client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Frame(FramePayload),
}

/// Events the server sends back, one per client event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    FrameReturn(PostureVerdict),
    NoSubject(ErrorBody),
    FrameError(ErrorBody),
}

/// JSON error body shared by HTTP responses and websocket events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorBody {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::new("invalid_message", message)
    }
}

impl From<&PostureError> for ErrorBody {
    fn from(err: &PostureError) -> Self {
        ErrorBody::new(err.kind(), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub detector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub detector: String,
}
