pub mod context;
pub mod domain;
pub mod frame_coordinator;
pub mod smoothing;

pub use frame_coordinator::{FrameCoordinator, FrameOutcome};
pub use smoothing::KeypointSmoother;
