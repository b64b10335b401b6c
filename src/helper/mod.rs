pub mod posture_classifier;
pub mod vector_geometry;
