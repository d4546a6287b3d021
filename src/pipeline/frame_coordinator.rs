use tracing::{debug, info};

use crate::common::keypoint::{JointSet, KeypointFrame};
use crate::config::CoachConfig;
use crate::error::FrameError;
use crate::pipeline::context::{FrameContext, GatedState, IngestedState};
use crate::pipeline::domain::exercise::ExerciseKind;
use crate::pipeline::domain::payload::RenderingPayload;
use crate::pipeline::domain::rep_state::{RepState, Transition};
use crate::pipeline::domain::rules;
use crate::pipeline::smoothing::{self, KeypointSmoother};

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Evaluated(Transition),
    /// Nothing usable in the frame; the state was left untouched
    Skipped(FrameError),
}

/// Runs one frame through gating, the rules and the rep state machine.
///
/// The coordinator owns no counters: the caller passes the session's
/// [`RepState`] in on every call.
pub struct FrameCoordinator {
    config: CoachConfig,
    smoother: Box<dyn KeypointSmoother>,
}

impl FrameCoordinator {
    pub fn new(config: CoachConfig) -> Self {
        let smoother = smoothing::from_config(&config.smoothing);
        Self { config, smoother }
    }

    pub fn with_smoother(mut self, smoother: Box<dyn KeypointSmoother>) -> Self {
        self.smoother = smoother;
        self
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    pub fn process(
        &mut self,
        state: &mut RepState,
        frame: KeypointFrame,
        kind: ExerciseKind,
    ) -> RenderingPayload {
        self.process_with_outcome(state, frame, kind).0
    }

    /// Same as [`FrameCoordinator::process`], also reporting whether the frame
    /// was evaluated. Skipped frames yield the payload of the unchanged state.
    pub fn process_with_outcome(
        &mut self,
        state: &mut RepState,
        frame: KeypointFrame,
        kind: ExerciseKind,
    ) -> (RenderingPayload, FrameOutcome) {
        let context = FrameContext::new(frame, kind);
        let frame_id = context.frame().frame_id();

        let outcome = match self.gate(context) {
            Ok(context) => FrameOutcome::Evaluated(self.evaluate(state, context)),
            Err(error) => {
                debug!("Skipping frame {}: {}", frame_id, error);
                self.smoother.reset();
                FrameOutcome::Skipped(error)
            }
        };

        (RenderingPayload::from(&*state), outcome)
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
    }

    fn gate(
        &self,
        context: FrameContext<IngestedState>,
    ) -> Result<FrameContext<GatedState>, FrameError> {
        let joints = {
            let person = context
                .frame()
                .person()
                .filter(|person| !person.is_empty())
                .ok_or(FrameError::NoDetection)?;
            JointSet::extract(
                person,
                context.kind().required_joints(),
                self.config.confidence_threshold,
            )?
        };
        Ok(context.into_gated(joints))
    }

    fn evaluate(&mut self, state: &mut RepState, context: FrameContext<GatedState>) -> Transition {
        let joints = self.smoother.smooth(*context.joints());
        let evaluation = rules::evaluate(context.kind(), &joints, &self.config.thresholds);
        let context = context.into_evaluated(evaluation);
        let evaluation = context.evaluation();

        let transition = state.advance(evaluation, self.config.reps_per_set);
        debug!(
            frame = %context.frame().frame_id(),
            kind = evaluation.kind.as_str(),
            signal = evaluation.phase_signal,
            band = ?evaluation.band,
            violations = ?evaluation.violations,
            elapsed_us = context.elapsed().as_micros() as u64,
            "Evaluated frame: {:?}",
            transition
        );

        match transition {
            Transition::RepCounted { rep } => {
                info!("{} rep {} counted", evaluation.kind, rep)
            }
            Transition::SetCompleted { set } => {
                info!("{} set {} completed", evaluation.kind, set)
            }
            Transition::None | Transition::Rested => {}
        }
        transition
    }
}
