use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use crate::helper::vector_geometry::VectorBundle;

/// Head-to-neck angle from vertical, in degrees, above which the head is forward.
pub const FORWARD_HEAD_ANGLE_THRESHOLD_DEG: f64 = 25.0;

/// Relative difference of head-to-shoulder distances above which the head is tilted.
pub const HEAD_TILT_RATIO_THRESHOLD: f64 = 0.15;

/// Shoulder height difference, as a fraction of frame height, above which shoulders are uneven.
pub const SHOULDER_IMBALANCE_RATIO_THRESHOLD: f64 = 0.05;

/// Downward vertical in image space (y grows towards the bottom of the frame).
pub fn vertical_down() -> Vector3<f64> {
    Vector3::new(0.0, 1.0, 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostureLabel {
    Good,
    Poor,
}

impl PostureLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            PostureLabel::Good => "good",
            PostureLabel::Poor => "poor",
        }
    }
}

/// PostureIssue is a single posture defect; variants are declared in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureIssue {
    ForwardHead,
    HeadTilt,
    UnevenShoulders,
}

impl PostureIssue {
    pub fn as_str(self) -> &'static str {
        match self {
            PostureIssue::ForwardHead => "forward_head",
            PostureIssue::HeadTilt => "head_tilt",
            PostureIssue::UnevenShoulders => "uneven_shoulders",
        }
    }

    /// description is the human readable text shown to end users.
    pub fn description(self) -> &'static str {
        match self {
            PostureIssue::ForwardHead => "Forward head",
            PostureIssue::HeadTilt => "Head tilt",
            PostureIssue::UnevenShoulders => "Uneven shoulders",
        }
    }
}

/// PostureMeasurements are the raw values each check compares against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureMeasurements {
    pub neck_angle_deg: f64,
    pub head_tilt_ratio: f64,
    pub shoulder_imbalance_ratio: f64,
}

/// PostureVerdict is the classification of a single frame.
///
/// `issues` is empty exactly when `label` is good, and is ordered
/// forward head, head tilt, uneven shoulders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostureVerdict {
    label: PostureLabel,
    issues: Vec<PostureIssue>,
    measurements: PostureMeasurements,
}

impl PostureVerdict {
    pub fn label(&self) -> PostureLabel {
        self.label
    }

    pub fn issues(&self) -> &[PostureIssue] {
        &self.issues
    }

    pub fn measurements(&self) -> &PostureMeasurements {
        &self.measurements
    }

    pub fn is_good(&self) -> bool {
        self.label == PostureLabel::Good
    }

    /// summary joins the issue descriptions, or reports good posture.
    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return "Good posture".to_string()
        }
        self.issues
            .iter()
            .map(|issue| issue.description())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// angle_between_deg returns the angle between two vectors in degrees.
///
/// A zero-length vector has no direction; the angle is reported as 0.
pub fn angle_between_deg(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let norm_a = a.norm();
    let norm_b = b.norm();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0
    }
    let cosine = (a / norm_a).dot(&(b / norm_b)).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

/// head_tilt_ratio compares the 2D head-to-shoulder distances on both sides.
///
/// # Arguments
/// * `head_to_left_shoulder` - displacement from head to left shoulder
/// * `head_to_right_shoulder` - displacement from head to right shoulder
///
/// # Returns
/// * `f64` - `|left - right| / max(left, right)`, 0 when both distances are 0
pub fn head_tilt_ratio(head_to_left_shoulder: &Vector3<f64>, head_to_right_shoulder: &Vector3<f64>) -> f64 {
    let left_dist = head_to_left_shoulder.xy().norm();
    let right_dist = head_to_right_shoulder.xy().norm();
    let longest = left_dist.max(right_dist);
    if longest == 0.0 {
        return 0.0
    }
    (left_dist - right_dist).abs() / longest
}

/// shoulder_imbalance_ratio is the raw shoulder y difference relative to frame height.
pub fn shoulder_imbalance_ratio(left_shoulder_y: f64, right_shoulder_y: f64, frame_height: u32) -> f64 {
    if frame_height == 0 {
        return 0.0
    }
    (left_shoulder_y - right_shoulder_y).abs() / frame_height as f64
}

/// PostureClassifier applies the fixed posture thresholds to a frame's vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostureClassifier;

impl PostureClassifier {
    pub fn new() -> Self {
        PostureClassifier
    }

    /// measure computes the value behind every posture check.
    ///
    /// # Arguments
    /// * `vectors` - displacement vectors of the frame
    /// * `frame_height` - source frame height in pixels
    /// * `left_shoulder_y` - raw left shoulder y coordinate in pixels
    /// * `right_shoulder_y` - raw right shoulder y coordinate in pixels
    ///
    /// # Returns
    /// * `PostureMeasurements`
    pub fn measure(
        &self,
        vectors: &VectorBundle,
        frame_height: u32,
        left_shoulder_y: f64,
        right_shoulder_y: f64,
    ) -> PostureMeasurements {
        PostureMeasurements {
            neck_angle_deg: angle_between_deg(&vectors.head_to_neck, &vertical_down()),
            head_tilt_ratio: head_tilt_ratio(&vectors.head_to_left_shoulder, &vectors.head_to_right_shoulder),
            shoulder_imbalance_ratio: shoulder_imbalance_ratio(left_shoulder_y, right_shoulder_y, frame_height),
        }
    }

    /// verdict evaluates every check (no short circuit) and aggregates the flags.
    pub fn verdict(&self, measurements: PostureMeasurements) -> PostureVerdict {
        let checks = [
            (PostureIssue::ForwardHead, measurements.neck_angle_deg > FORWARD_HEAD_ANGLE_THRESHOLD_DEG),
            (PostureIssue::HeadTilt, measurements.head_tilt_ratio > HEAD_TILT_RATIO_THRESHOLD),
            (PostureIssue::UnevenShoulders, measurements.shoulder_imbalance_ratio > SHOULDER_IMBALANCE_RATIO_THRESHOLD),
        ];

        let issues: Vec<PostureIssue> = checks
            .iter()
            .filter(|(_, flagged)| *flagged)
            .map(|(issue, _)| *issue)
            .collect();

        let label = if issues.is_empty() { PostureLabel::Good } else { PostureLabel::Poor };

        PostureVerdict {
            label,
            issues,
            measurements,
        }
    }

    /// classify measures the frame and returns its verdict.
    pub fn classify(
        &self,
        vectors: &VectorBundle,
        frame_height: u32,
        left_shoulder_y: f64,
        right_shoulder_y: f64,
    ) -> PostureVerdict {
        self.verdict(self.measure(vectors, frame_height, left_shoulder_y, right_shoulder_y))
    }
}
