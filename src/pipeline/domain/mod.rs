pub mod exercise;
pub mod payload;
pub mod rep_state;
pub mod rules;

pub use exercise::{AlertLevel, Evaluation, ExerciseKind, PhaseBand, Stage, Violation};
pub use payload::{DisplayColor, RenderingPayload};
pub use rep_state::{RepState, Transition};
