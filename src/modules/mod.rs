pub mod landmark_source;
pub mod pose_landmark_client;
