pub mod geometry;
pub mod keypoint;

pub use geometry::Point2;
pub use keypoint::{Joint, JointSet, Keypoint, KeypointFrame};
