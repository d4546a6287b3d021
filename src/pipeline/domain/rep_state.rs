use serde::{Deserialize, Serialize};

use crate::pipeline::domain::exercise::{AlertLevel, Evaluation, ExerciseKind, PhaseBand, Stage};

pub const READY_FEEDBACK: &str = "READY?";

/// What one evaluated frame did to the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Dead zone, already at rest, or a rep blocked by form
    None,
    /// Returned to the rest position
    Rested,
    RepCounted { rep: u32 },
    /// The rep that completed a set; the rep counter is back at zero
    SetCompleted { set: u32 },
}

/// Counters and stage of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepState {
    stage: Stage,
    rep_count: u32,
    set_count: u32,
    last_feedback: String,
    last_alert: Option<AlertLevel>,
    kind: Option<ExerciseKind>,
    awaiting_rest: bool,
}

impl Default for RepState {
    fn default() -> Self {
        Self::new()
    }
}

impl RepState {
    pub fn new() -> Self {
        Self {
            stage: Stage::Down,
            rep_count: 0,
            set_count: 0,
            last_feedback: READY_FEEDBACK.to_string(),
            last_alert: None,
            kind: None,
            awaiting_rest: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn set_count(&self) -> u32 {
        self.set_count
    }

    pub fn last_feedback(&self) -> &str {
        &self.last_feedback
    }

    pub fn last_alert(&self) -> Option<AlertLevel> {
        self.last_alert
    }

    pub fn kind(&self) -> Option<ExerciseKind> {
        self.kind
    }

    pub fn is_awaiting_rest(&self) -> bool {
        self.awaiting_rest
    }

    /// Advances the stage and counters from one frame's evaluation.
    ///
    /// Reaching rest is never blocked. Leaving rest counts a rep only when
    /// the exercise's gating checks pass on the frame that crosses into the
    /// Up band. A gated crossing, like an exercise switch, disarms counting
    /// until the rest band is seen again.
    pub fn advance(&mut self, evaluation: &Evaluation, reps_per_set: u32) -> Transition {
        if self.kind.is_some_and(|kind| kind != evaluation.kind) {
            self.awaiting_rest = true;
        }
        self.kind = Some(evaluation.kind);
        self.last_feedback.clone_from(&evaluation.feedback);
        self.last_alert = Some(evaluation.alert);

        match evaluation.band {
            PhaseBand::Down => {
                self.awaiting_rest = false;
                if self.stage == Stage::Down {
                    return Transition::None;
                }
                self.stage = Stage::Down;
                Transition::Rested
            }
            PhaseBand::Up => {
                if self.stage != Stage::Down || self.awaiting_rest {
                    return Transition::None;
                }
                if evaluation.blocks_rep() {
                    // this ascent is spent; correcting form at the top does not count it
                    self.awaiting_rest = true;
                    return Transition::None;
                }
                self.stage = Stage::Up;
                self.rep_count += 1;
                if self.rep_count >= reps_per_set {
                    self.set_count += 1;
                    self.rep_count = 0;
                    return Transition::SetCompleted {
                        set: self.set_count,
                    };
                }
                Transition::RepCounted {
                    rep: self.rep_count,
                }
            }
            PhaseBand::Between => Transition::None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::exercise::Violation;

    fn curl(band: PhaseBand) -> Evaluation {
        Evaluation::new(ExerciseKind::BicepCurl, 0.0, band, vec![])
    }

    fn swaying_curl(band: PhaseBand) -> Evaluation {
        Evaluation::new(ExerciseKind::BicepCurl, 0.0, band, vec![Violation::BackSway])
    }

    fn raise(band: PhaseBand) -> Evaluation {
        Evaluation::new(ExerciseKind::FrontRaise, 0.0, band, vec![])
    }

    #[test]
    fn initial_state_is_ready() {
        let state = RepState::new();
        assert_eq!(state.stage(), Stage::Down);
        assert_eq!((state.rep_count(), state.set_count()), (0, 0));
        assert_eq!(state.last_feedback(), READY_FEEDBACK);
        assert_eq!(state.last_alert(), None);
    }

    #[test]
    fn down_then_up_counts_one_rep() {
        let mut state = RepState::new();
        assert_eq!(state.advance(&curl(PhaseBand::Down), 10), Transition::None);
        assert_eq!(state.advance(&curl(PhaseBand::Up), 10), Transition::RepCounted { rep: 1 });
        assert_eq!(state.stage(), Stage::Up);
        // holding the top position does not count again
        assert_eq!(state.advance(&curl(PhaseBand::Up), 10), Transition::None);
        assert_eq!(state.rep_count(), 1);
    }

    #[test]
    fn dead_zone_changes_nothing() {
        let mut state = RepState::new();
        state.advance(&curl(PhaseBand::Down), 10);
        let before = state.clone();
        for _ in 0..5 {
            assert_eq!(state.advance(&curl(PhaseBand::Between), 10), Transition::None);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn full_set_rolls_over() {
        let mut state = RepState::new();
        let mut last = Transition::None;
        for _ in 0..10 {
            state.advance(&curl(PhaseBand::Down), 10);
            last = state.advance(&curl(PhaseBand::Up), 10);
        }
        assert_eq!(last, Transition::SetCompleted { set: 1 });
        assert_eq!(state.rep_count(), 0);
        assert_eq!(state.set_count(), 1);
    }

    #[test]
    fn gating_violation_blocks_rep_but_not_rest() {
        let mut state = RepState::new();
        state.advance(&swaying_curl(PhaseBand::Down), 10);
        assert_eq!(state.advance(&swaying_curl(PhaseBand::Up), 10), Transition::None);
        assert_eq!(state.stage(), Stage::Down);
        assert_eq!(state.rep_count(), 0);
        assert_eq!(state.last_feedback(), "LOCK YOUR BACK!");
        assert_eq!(state.last_alert(), Some(AlertLevel::Warning));
    }

    #[test]
    fn correcting_form_at_the_top_does_not_count_blocked_rep() {
        let mut state = RepState::new();
        state.advance(&curl(PhaseBand::Down), 10);
        assert_eq!(state.advance(&swaying_curl(PhaseBand::Up), 10), Transition::None);
        assert!(state.is_awaiting_rest());
        // back straightened while still holding the top
        assert_eq!(state.advance(&curl(PhaseBand::Up), 10), Transition::None);
        assert_eq!(state.advance(&curl(PhaseBand::Between), 10), Transition::None);
        assert_eq!(state.advance(&curl(PhaseBand::Up), 10), Transition::None);
        assert_eq!(state.rep_count(), 0);

        state.advance(&curl(PhaseBand::Down), 10);
        assert!(!state.is_awaiting_rest());
        assert_eq!(state.advance(&curl(PhaseBand::Up), 10), Transition::RepCounted { rep: 1 });
    }

    #[test]
    fn rest_is_reachable_from_up_with_bad_form() {
        let mut state = RepState::new();
        state.advance(&curl(PhaseBand::Up), 10);
        assert_eq!(state.stage(), Stage::Up);
        assert_eq!(state.advance(&swaying_curl(PhaseBand::Down), 10), Transition::Rested);
        assert_eq!(state.stage(), Stage::Down);
    }

    #[test]
    fn switching_exercise_requires_rest_first() {
        let mut state = RepState::new();
        state.advance(&curl(PhaseBand::Down), 10);
        // still at rest for the curl, but already in the raise's top band
        assert_eq!(state.advance(&raise(PhaseBand::Up), 10), Transition::None);
        assert!(state.is_awaiting_rest());
        assert_eq!(state.rep_count(), 0);

        state.advance(&raise(PhaseBand::Down), 10);
        assert!(!state.is_awaiting_rest());
        assert_eq!(state.advance(&raise(PhaseBand::Up), 10), Transition::RepCounted { rep: 1 });
    }

    #[test]
    fn switching_keeps_counters() {
        let mut state = RepState::new();
        state.advance(&curl(PhaseBand::Down), 10);
        state.advance(&curl(PhaseBand::Up), 10);
        state.advance(&raise(PhaseBand::Between), 10);
        assert_eq!(state.rep_count(), 1);
        assert_eq!(state.kind(), Some(ExerciseKind::FrontRaise));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut state = RepState::new();
        state.advance(&curl(PhaseBand::Up), 10);
        state.reset();
        assert_eq!(state, RepState::new());
    }
}
