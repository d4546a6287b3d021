use crate::common::keypoint::JointSet;
use crate::pipeline::domain::exercise::Evaluation;

// Markers to track the state of the frame processing pipeline
pub struct IngestedState;
pub struct GatedState {
    pub(super) joints: JointSet,
}
pub struct EvaluatedState {
    pub(super) evaluation: Evaluation,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for IngestedState {
    fn state_name() -> &'static str {
        "Ingested"
    }
}

impl ProcessingState for GatedState {
    fn state_name() -> &'static str {
        "Gated"
    }
}

impl ProcessingState for EvaluatedState {
    fn state_name() -> &'static str {
        "Evaluated"
    }
}
