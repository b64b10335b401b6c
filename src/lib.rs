pub mod api;
pub mod config;
pub mod error;
pub mod helper;
pub mod logging;
pub mod modules;
pub mod pipeline;
pub mod triton_client;
pub mod utils;

pub use error::{DecodeError, PostureError};
pub use helper::posture_classifier::{PostureIssue, PostureLabel, PostureMeasurements, PostureVerdict};
pub use modules::landmark_source::{LandmarkDetection, LandmarkSource};
pub use pipeline::pipeline::PosturePipeline;
pub use utils::coordinate::{Keypoint, KeypointSet, PoseLandmark};
pub use utils::image::RgbFrame;
