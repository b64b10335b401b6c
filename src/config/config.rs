use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
    pub cors_allow_any_origin: bool,
}

impl ServerConfig {
    pub(crate) fn new() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 5000,
            request_timeout_ms: 10_000,
            cors_allow_any_origin: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// PoseModelConfig describes the pose landmark model served by Triton.
///
/// Input tensor name, layout and size come from the model metadata; only the
/// outputs and the pixel normalization are configured here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoseModelConfig {
    pub endpoint: String,
    pub model_name: String,
    pub model_version: String,
    pub timeout_ms: u64,
    pub landmarks_output: String,
    /// Empty when the model has no subject presence output.
    pub presence_output: String,
    pub values_per_landmark: usize,
    pub presence_threshold: f32,
    pub presence_is_logit: bool,
    pub mean: f32,
    pub scale: f32,
}

impl PoseModelConfig {
    pub(crate) fn new() -> Self {
        PoseModelConfig {
            endpoint: "http://127.0.0.1:8001".to_string(),
            model_name: "pose_landmark".to_string(),
            model_version: "".to_string(),
            timeout_ms: 5_000,
            landmarks_output: "Identity".to_string(),
            presence_output: "Identity_1".to_string(),
            values_per_landmark: 5,
            presence_threshold: 0.5,
            presence_is_logit: false,
            mean: 0.0,
            scale: 0.00392156862745098,
        }
    }
}

impl Default for PoseModelConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl LoggingConfig {
    pub(crate) fn new() -> Self {
        LoggingConfig {
            filter: "info,rs_posture_pipeline=debug".to_string(),
            json: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pose_model: PoseModelConfig,
    pub logging: LoggingConfig,
}
