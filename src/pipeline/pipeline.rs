use std::sync::Arc;
use std::time::{Duration, Instant};
use crate::error::PostureError;
use crate::helper::posture_classifier::{PostureClassifier, PostureVerdict};
use crate::helper::vector_geometry::{PostureKeypoints, VectorBundle};
use crate::modules::landmark_source::{LandmarkDetection, LandmarkSource};
use crate::utils::coordinate::KeypointSet;
use crate::utils::image::decode_frame;

/// PosturePipeline turns an encoded frame into a posture verdict.
///
/// The pipeline holds no per-frame state; clones share the same landmark source.
#[derive(Clone)]
pub struct PosturePipeline {
    landmark_source: Arc<dyn LandmarkSource>,
    classifier: PostureClassifier,
}

impl PosturePipeline {
    /// new initializes new instance of the pipeline
    pub fn new(landmark_source: Arc<dyn LandmarkSource>) -> Self {
        PosturePipeline {
            landmark_source,
            classifier: PostureClassifier::new(),
        }
    }

    pub fn landmark_source(&self) -> &Arc<dyn LandmarkSource> {
        &self.landmark_source
    }

    /// classify_posture decodes the frame, detects landmarks and classifies them.
    ///
    /// Decoding runs on the blocking pool so a large frame does not stall the runtime.
    ///
    /// # Arguments
    /// * `payload` - base64 image, optionally behind a `data:` URI header
    ///
    /// # Returns
    /// * `Result<PostureVerdict, PostureError>` - no verdict is produced on any failure
    pub async fn classify_posture(&self, payload: &str) -> Result<PostureVerdict, PostureError> {
        let started = Instant::now();

        let owned_payload = payload.to_owned();
        let decoded = tokio::task::spawn_blocking(move || decode_frame(&owned_payload))
            .await
            .unwrap_or_else(|err| Err(err.into()));
        let frame = match decoded {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, payload_len = payload.len(), "rejected frame");
                return Err(err.into())
            }
        };
        let frame_height = frame.height();
        tracing::debug!(width = frame.width(), height = frame_height, "decoded frame");

        let keypoints = match self.landmark_source.detect(frame).await {
            Ok(LandmarkDetection::Detected(keypoints)) => keypoints,
            Ok(LandmarkDetection::NoSubject) => {
                tracing::debug!(source = self.landmark_source.name(), "no subject detected");
                return Err(PostureError::NoSubjectDetected)
            }
            Err(err) => {
                tracing::error!(source = self.landmark_source.name(), error = %format!("{err:#}"), "landmark detection failed");
                return Err(PostureError::LandmarkModel(err))
            }
        };

        let verdict = self.classify_keypoints(&keypoints, frame_height)?;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "frame classified");
        Ok(verdict)
    }

    /// classify_posture_with_timeout bounds the whole invocation by `timeout`.
    pub async fn classify_posture_with_timeout(&self, payload: &str, timeout: Duration) -> Result<PostureVerdict, PostureError> {
        match tokio::time::timeout(timeout, self.classify_posture(payload)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout_ms = timeout.as_millis() as u64, "posture classification timed out");
                Err(PostureError::Timeout(timeout))
            }
        }
    }

    /// classify_keypoints runs the detector-free tail of the pipeline.
    ///
    /// # Arguments
    /// * `keypoints` - landmarks in image-pixel space
    /// * `frame_height` - height of the frame the landmarks came from
    ///
    /// # Returns
    /// * `Result<PostureVerdict, PostureError>` - fails only with `IncompleteLandmarks`
    pub fn classify_keypoints(&self, keypoints: &KeypointSet, frame_height: u32) -> Result<PostureVerdict, PostureError> {
        let posture_keypoints = match PostureKeypoints::from_keypoint_set(keypoints) {
            Ok(posture_keypoints) => posture_keypoints,
            Err(err) => {
                tracing::error!(error = %err, detected = keypoints.len(), "detection lacks required landmarks");
                return Err(err)
            }
        };

        let vectors = VectorBundle::from_keypoints(&posture_keypoints);
        let verdict = self.classifier.classify(
            &vectors,
            frame_height,
            posture_keypoints.left_shoulder.y,
            posture_keypoints.right_shoulder.y,
        );

        let measurements = verdict.measurements();
        tracing::info!(
            label = verdict.label().as_str(),
            issues = ?verdict.issues(),
            neck_angle_deg = measurements.neck_angle_deg,
            head_tilt_ratio = measurements.head_tilt_ratio,
            shoulder_imbalance_ratio = measurements.shoulder_imbalance_ratio,
            "posture verdict"
        );
        Ok(verdict)
    }
}
