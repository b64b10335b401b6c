use anyhow::Error;
use async_trait::async_trait;
use crate::utils::coordinate::KeypointSet;
use crate::utils::image::RgbFrame;

/// LandmarkDetection is the outcome of running the pose detector on a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum LandmarkDetection {
    Detected(KeypointSet),
    NoSubject,
}

/// LandmarkSource maps an RGB frame to named body keypoints in image-pixel space.
///
/// Implementations are shared by every request and must be safe for concurrent use.
#[async_trait]
pub trait LandmarkSource: Send + Sync {
    /// detect runs pose landmark detection on a single frame.
    ///
    /// # Arguments
    /// * `frame` - decoded frame in RGB channel order
    ///
    /// # Returns
    /// * `Result<LandmarkDetection, Error>` - an error means the detector itself failed
    async fn detect(&self, frame: RgbFrame) -> Result<LandmarkDetection, Error>;

    /// ready reports whether the detector can currently serve requests.
    async fn ready(&self) -> Result<bool, Error> {
        Ok(true)
    }

    fn name(&self) -> &str;
}
