use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::keypoint::Joint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    #[serde(alias = "Standing Bicep Curl")]
    BicepCurl,
    #[serde(alias = "Standing Upright Row")]
    UprightRow,
    #[serde(alias = "Standing Front Raise")]
    FrontRaise,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 3] = [
        ExerciseKind::BicepCurl,
        ExerciseKind::UprightRow,
        ExerciseKind::FrontRaise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "bicep_curl",
            ExerciseKind::UprightRow => "upright_row",
            ExerciseKind::FrontRaise => "front_raise",
        }
    }

    /// Name shown in the exercise selector.
    pub fn display_name(&self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "Standing Bicep Curl",
            ExerciseKind::UprightRow => "Standing Upright Row",
            ExerciseKind::FrontRaise => "Standing Front Raise",
        }
    }

    /// Joints the rules read for this exercise; all of them must be
    /// confidently detected before a frame is evaluated.
    pub fn required_joints(&self) -> &'static [Joint] {
        match self {
            ExerciseKind::BicepCurl | ExerciseKind::UprightRow => &Joint::ALL,
            ExerciseKind::FrontRaise => &[Joint::Shoulder, Joint::Elbow, Joint::Hip],
        }
    }

    /// Form violations that prevent a rep from counting.
    pub fn gating_violations(&self) -> &'static [Violation] {
        match self {
            ExerciseKind::BicepCurl => &[Violation::BackSway],
            ExerciseKind::UprightRow | ExerciseKind::FrontRaise => &[],
        }
    }

    pub fn good_form_message(&self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "PERFECT FORM",
            ExerciseKind::UprightRow => "GOOD SQUEEZE",
            ExerciseKind::FrontRaise => "NICE CONTROL",
        }
    }

    /// Selector entries in display order, keyed by wire name.
    pub fn catalog() -> IndexMap<&'static str, &'static str> {
        Self::ALL
            .iter()
            .map(|kind| (kind.as_str(), kind.display_name()))
            .collect()
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ExerciseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.as_str().eq_ignore_ascii_case(needle)
                    || kind.display_name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| format!("Unknown exercise '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Ok,
    Warning,
}

/// Where in the repetition cycle the tracked limb is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Down,
    Up,
}

/// The phase signal of one frame classified against an exercise's bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseBand {
    Down,
    Up,
    /// Dead zone between the bands, or an ambiguous signal
    Between,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    BackSway,
    ElbowDrift,
    ElbowsTooHigh,
    GripTooNarrow,
    RaisedTooHigh,
    LeaningBack,
}

impl Violation {
    pub fn message(&self) -> &'static str {
        match self {
            Violation::BackSway => "LOCK YOUR BACK!",
            Violation::ElbowDrift => "KEEP ELBOWS DOWN!",
            Violation::ElbowsTooHigh => "LOWER YOUR ELBOWS!",
            Violation::GripTooNarrow => "WIDEN YOUR GRIP!",
            Violation::RaisedTooHigh => "STOP AT EYE LEVEL!",
            Violation::LeaningBack => "STAND STRAIGHT!",
        }
    }
}

/// Rule set output for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub kind: ExerciseKind,
    pub feedback: String,
    pub alert: AlertLevel,
    pub phase_signal: f32,
    pub band: PhaseBand,
    pub violations: Vec<Violation>,
}

impl Evaluation {
    pub(crate) fn new(
        kind: ExerciseKind,
        phase_signal: f32,
        band: PhaseBand,
        violations: Vec<Violation>,
    ) -> Self {
        let (feedback, alert) = match violations.first() {
            Some(violation) => (violation.message().to_string(), AlertLevel::Warning),
            None => (kind.good_form_message().to_string(), AlertLevel::Ok),
        };
        Self {
            kind,
            feedback,
            alert,
            phase_signal,
            band,
            violations,
        }
    }

    /// Whether any violation present blocks the rep from counting.
    pub fn blocks_rep(&self) -> bool {
        self.kind
            .gating_violations()
            .iter()
            .any(|gate| self.violations.contains(gate))
    }
}
