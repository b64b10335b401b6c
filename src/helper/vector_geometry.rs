use nalgebra::Vector3;
use serde::Serialize;
use crate::error::PostureError;
use crate::utils::coordinate::{Keypoint, KeypointSet, PoseLandmark};

/// Landmarks every posture check depends on.
pub const REQUIRED_LANDMARKS: [PoseLandmark; 3] = [
    PoseLandmark::Nose,
    PoseLandmark::LeftShoulder,
    PoseLandmark::RightShoulder,
];

/// PostureKeypoints holds the three landmarks the posture checks read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureKeypoints {
    pub nose: Keypoint,
    pub left_shoulder: Keypoint,
    pub right_shoulder: Keypoint,
}

impl PostureKeypoints {
    /// from_keypoint_set selects the required landmarks out of a detection.
    ///
    /// # Arguments
    /// * `keypoints` - landmarks produced by the landmark source
    ///
    /// # Returns
    /// * `Result<PostureKeypoints, PostureError>` - `IncompleteLandmarks` lists
    ///   every required landmark that is absent or not finite
    pub fn from_keypoint_set(keypoints: &KeypointSet) -> Result<Self, PostureError> {
        let missing = keypoints.missing(&REQUIRED_LANDMARKS);

        match (
            keypoints.get(PoseLandmark::Nose),
            keypoints.get(PoseLandmark::LeftShoulder),
            keypoints.get(PoseLandmark::RightShoulder),
        ) {
            (Some(nose), Some(left_shoulder), Some(right_shoulder)) if missing.is_empty() => Ok(PostureKeypoints {
                nose: *nose,
                left_shoulder: *left_shoulder,
                right_shoulder: *right_shoulder,
            }),
            _ => Err(PostureError::IncompleteLandmarks(missing)),
        }
    }

    /// The nose stands in for the head.
    pub fn head(&self) -> Vector3<f64> {
        self.nose.to_vector()
    }

    /// The neck is the componentwise midpoint of the shoulders.
    pub fn neck(&self) -> Vector3<f64> {
        (self.left_shoulder.to_vector() + self.right_shoulder.to_vector()) / 2.0
    }

    pub fn left_shoulder_point(&self) -> Vector3<f64> {
        self.left_shoulder.to_vector()
    }

    pub fn right_shoulder_point(&self) -> Vector3<f64> {
        self.right_shoulder.to_vector()
    }
}

/// VectorName identifies one of the displacement vectors of a VectorBundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorName {
    HeadToNeck,
    NeckToRightShoulder,
    HeadToRightShoulder,
    NeckToLeftShoulder,
    HeadToLeftShoulder,
}

impl VectorName {
    pub const ALL: [VectorName; 5] = [
        VectorName::HeadToNeck,
        VectorName::NeckToRightShoulder,
        VectorName::HeadToRightShoulder,
        VectorName::NeckToLeftShoulder,
        VectorName::HeadToLeftShoulder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VectorName::HeadToNeck => "head_to_neck",
            VectorName::NeckToRightShoulder => "neck_to_right_shoulder",
            VectorName::HeadToRightShoulder => "head_to_right_shoulder",
            VectorName::NeckToLeftShoulder => "neck_to_left_shoulder",
            VectorName::HeadToLeftShoulder => "head_to_left_shoulder",
        }
    }
}

/// VectorBundle is the fixed set of signed displacements (`end - start`)
/// between head, neck and shoulders, in pixel x/y and relative z.
///
/// The right shoulder is the primary side: `neck_to_right_shoulder` and
/// `head_to_right_shoulder` are the single-sided pair. The left-side vectors
/// sit alongside them and the pair is not symmetrized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorBundle {
    pub head_to_neck: Vector3<f64>,
    pub neck_to_right_shoulder: Vector3<f64>,
    pub head_to_right_shoulder: Vector3<f64>,
    pub neck_to_left_shoulder: Vector3<f64>,
    pub head_to_left_shoulder: Vector3<f64>,
}

impl VectorBundle {
    pub fn from_keypoints(keypoints: &PostureKeypoints) -> Self {
        let head = keypoints.head();
        let neck = keypoints.neck();
        let right_shoulder = keypoints.right_shoulder_point();
        let left_shoulder = keypoints.left_shoulder_point();

        VectorBundle {
            head_to_neck: neck - head,
            neck_to_right_shoulder: right_shoulder - neck,
            head_to_right_shoulder: right_shoulder - head,
            neck_to_left_shoulder: left_shoulder - neck,
            head_to_left_shoulder: left_shoulder - head,
        }
    }

    pub fn get(&self, name: VectorName) -> Vector3<f64> {
        match name {
            VectorName::HeadToNeck => self.head_to_neck,
            VectorName::NeckToRightShoulder => self.neck_to_right_shoulder,
            VectorName::HeadToRightShoulder => self.head_to_right_shoulder,
            VectorName::NeckToLeftShoulder => self.neck_to_left_shoulder,
            VectorName::HeadToLeftShoulder => self.head_to_left_shoulder,
        }
    }

    pub fn entries(&self) -> [(VectorName, Vector3<f64>); 5] {
        VectorName::ALL.map(|name| (name, self.get(name)))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;
    use crate::error::PostureError;
    use crate::helper::vector_geometry::{PostureKeypoints, VectorBundle, VectorName};
    use crate::utils::coordinate::{Keypoint, KeypointSet, PoseLandmark};

    fn upright_set() -> KeypointSet {
        vec![
            (PoseLandmark::Nose, Keypoint::new(100.0, 50.0, 0.0)),
            (PoseLandmark::LeftShoulder, Keypoint::new(70.0, 150.0, 0.0)),
            (PoseLandmark::RightShoulder, Keypoint::new(130.0, 150.0, 0.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_neck_is_shoulder_midpoint() {
        let keypoints = PostureKeypoints::from_keypoint_set(&upright_set()).unwrap();
        assert_eq!(keypoints.neck(), Vector3::new(100.0, 150.0, 0.0));
        assert_eq!(keypoints.head(), Vector3::new(100.0, 50.0, 0.0));
    }

    #[test]
    fn test_vectors_are_signed_displacements() {
        let keypoints = PostureKeypoints::from_keypoint_set(&upright_set()).unwrap();
        let bundle = VectorBundle::from_keypoints(&keypoints);

        assert_eq!(bundle.head_to_neck, Vector3::new(0.0, 100.0, 0.0));
        assert_eq!(bundle.neck_to_right_shoulder, Vector3::new(30.0, 0.0, 0.0));
        assert_eq!(bundle.neck_to_left_shoulder, Vector3::new(-30.0, 0.0, 0.0));
        assert_eq!(bundle.head_to_right_shoulder, Vector3::new(30.0, 100.0, 0.0));
        assert_eq!(bundle.head_to_left_shoulder, Vector3::new(-30.0, 100.0, 0.0));
    }

    #[test]
    fn test_right_shoulder_pair_is_not_symmetrized() {
        // right shoulder dropped 20 px; the right-side pair carries it alone
        let set: KeypointSet = vec![
            (PoseLandmark::Nose, Keypoint::new(100.0, 50.0, 0.0)),
            (PoseLandmark::LeftShoulder, Keypoint::new(70.0, 150.0, 0.0)),
            (PoseLandmark::RightShoulder, Keypoint::new(130.0, 170.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let bundle = VectorBundle::from_keypoints(&PostureKeypoints::from_keypoint_set(&set).unwrap());

        assert_eq!(bundle.head_to_right_shoulder, Vector3::new(30.0, 120.0, 0.0));
        assert_eq!(bundle.neck_to_right_shoulder, Vector3::new(30.0, 10.0, 0.0));
        assert_eq!(bundle.neck_to_left_shoulder, Vector3::new(-30.0, -10.0, 0.0));
        assert_ne!(bundle.head_to_right_shoulder.y, bundle.head_to_left_shoulder.y);
    }

    #[test]
    fn test_depth_component_is_kept() {
        let set: KeypointSet = vec![
            (PoseLandmark::Nose, Keypoint::new(0.0, 0.0, -0.4)),
            (PoseLandmark::LeftShoulder, Keypoint::new(-10.0, 10.0, 0.2)),
            (PoseLandmark::RightShoulder, Keypoint::new(10.0, 10.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let bundle = VectorBundle::from_keypoints(&PostureKeypoints::from_keypoint_set(&set).unwrap());
        assert!((bundle.head_to_neck.z - 0.5).abs() < 1e-12);
        assert!((bundle.neck_to_right_shoulder.z + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_bundle_has_exactly_five_named_entries() {
        let keypoints = PostureKeypoints::from_keypoint_set(&upright_set()).unwrap();
        let entries = VectorBundle::from_keypoints(&keypoints).entries();
        let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "head_to_neck",
                "neck_to_right_shoulder",
                "head_to_right_shoulder",
                "neck_to_left_shoulder",
                "head_to_left_shoulder"
            ]
        );
        assert_eq!(entries[0].0, VectorName::HeadToNeck);
    }

    #[test]
    fn test_missing_landmarks_are_reported() {
        let set: KeypointSet = vec![(PoseLandmark::Nose, Keypoint::new(1.0, 1.0, 0.0))].into_iter().collect();
        match PostureKeypoints::from_keypoint_set(&set) {
            Err(PostureError::IncompleteLandmarks(missing)) => {
                assert_eq!(missing, vec![PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_landmark_counts_as_missing() {
        let set: KeypointSet = vec![
            (PoseLandmark::Nose, Keypoint::new(f64::NAN, 1.0, 0.0)),
            (PoseLandmark::LeftShoulder, Keypoint::new(0.0, 2.0, 0.0)),
            (PoseLandmark::RightShoulder, Keypoint::new(2.0, 2.0, 0.0)),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            PostureKeypoints::from_keypoint_set(&set),
            Err(PostureError::IncompleteLandmarks(missing)) if missing == vec![PoseLandmark::Nose]
        ));
    }
}
