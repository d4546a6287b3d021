use crate::common::keypoint::{JointSet, KeypointFrame};
use crate::pipeline::context::metrics::FrameMetrics;
use crate::pipeline::context::state::{EvaluatedState, GatedState, IngestedState, ProcessingState};
use crate::pipeline::domain::exercise::{Evaluation, ExerciseKind};
use std::time::{Duration, Instant};

// FrameContext with compile-time state tracking: a frame can only be
// evaluated once its joints have passed gating.
pub struct FrameContext<S> {
    frame: KeypointFrame,
    kind: ExerciseKind,
    metrics: FrameMetrics,
    processing_start: Instant,
    state: S,
}

impl<S: ProcessingState> FrameContext<S> {
    pub fn frame(&self) -> &KeypointFrame {
        &self.frame
    }

    /// The exercise this frame is evaluated against, read once at ingestion.
    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.processing_start.elapsed()
    }

    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }
}

impl FrameContext<IngestedState> {
    pub fn new(frame: KeypointFrame, kind: ExerciseKind) -> Self {
        Self {
            frame,
            kind,
            metrics: FrameMetrics::new(),
            processing_start: Instant::now(),
            state: IngestedState,
        }
    }

    pub fn into_gated(mut self, joints: JointSet) -> FrameContext<GatedState> {
        self.metrics.record_gating_duration(self.elapsed());
        FrameContext::<GatedState> {
            frame: self.frame,
            kind: self.kind,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: GatedState { joints },
        }
    }
}

impl FrameContext<GatedState> {
    pub fn joints(&self) -> &JointSet {
        &self.state.joints
    }

    pub fn into_evaluated(mut self, evaluation: Evaluation) -> FrameContext<EvaluatedState> {
        self.metrics.record_evaluation_duration(self.elapsed());
        FrameContext::<EvaluatedState> {
            frame: self.frame,
            kind: self.kind,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: EvaluatedState { evaluation },
        }
    }
}

impl FrameContext<EvaluatedState> {
    pub fn evaluation(&self) -> &Evaluation {
        &self.state.evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::exercise::PhaseBand;

    #[test]
    fn walks_through_states_and_records_timings() {
        let context = FrameContext::new(KeypointFrame::empty(), ExerciseKind::UprightRow);
        assert_eq!(context.state_name(), "Ingested");

        let context = context.into_gated(JointSet::default());
        assert_eq!(context.state_name(), "Gated");
        assert!(context.metrics().gating_duration().is_some());

        let evaluation = Evaluation::new(ExerciseKind::UprightRow, 0.0, PhaseBand::Between, vec![]);
        let context = context.into_evaluated(evaluation.clone());
        assert_eq!(context.state_name(), "Evaluated");
        assert_eq!(context.kind(), ExerciseKind::UprightRow);
        assert_eq!(context.evaluation(), &evaluation);
        assert!(context.metrics().evaluation_duration().is_some());
    }
}
