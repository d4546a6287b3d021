//! Per-exercise form rules.
//!
//! Each rule reads the joints of the current frame only and reports the
//! phase signal, its band and every form check that fired. An ambiguous
//! (degenerate) angle lands in [`PhaseBand::Between`] and never fires the
//! checks that depend on it.

use crate::common::geometry::{checked_angle_at_vertex, Point2, DEGENERATE_ANGLE};
use crate::common::keypoint::JointSet;
use crate::config::{
    BicepCurlThresholds, ExerciseThresholds, FrontRaiseThresholds, UprightRowThresholds,
};
use crate::pipeline::domain::exercise::{Evaluation, ExerciseKind, PhaseBand, Violation};

pub fn evaluate(
    kind: ExerciseKind,
    joints: &JointSet,
    thresholds: &ExerciseThresholds,
) -> Evaluation {
    match kind {
        ExerciseKind::BicepCurl => bicep_curl(joints, &thresholds.bicep_curl),
        ExerciseKind::UprightRow => upright_row(joints, &thresholds.upright_row),
        ExerciseKind::FrontRaise => front_raise(joints, &thresholds.front_raise),
    }
}

fn bicep_curl(joints: &JointSet, thresholds: &BicepCurlThresholds) -> Evaluation {
    let (shoulder, elbow, wrist, hip) = positions(joints);
    let angle = checked_angle_at_vertex(shoulder, elbow, wrist);

    let band = match angle {
        Some(angle) if angle > thresholds.down_angle => PhaseBand::Down,
        Some(angle) if angle < thresholds.up_angle => PhaseBand::Up,
        _ => PhaseBand::Between,
    };

    let mut violations = Vec::new();
    if (shoulder.x - hip.x).abs() > thresholds.max_sway {
        violations.push(Violation::BackSway);
    }
    // image y grows downwards
    if elbow.y < shoulder.y {
        violations.push(Violation::ElbowDrift);
    }

    Evaluation::new(
        ExerciseKind::BicepCurl,
        angle.unwrap_or(DEGENERATE_ANGLE),
        band,
        violations,
    )
}

fn upright_row(joints: &JointSet, thresholds: &UprightRowThresholds) -> Evaluation {
    let (shoulder, elbow, wrist, hip) = positions(joints);

    let band = if wrist.y > hip.y {
        PhaseBand::Down
    } else if wrist.y < shoulder.y + thresholds.up_offset {
        PhaseBand::Up
    } else {
        PhaseBand::Between
    };

    let mut violations = Vec::new();
    if elbow.y < shoulder.y - thresholds.elbow_raise_limit {
        violations.push(Violation::ElbowsTooHigh);
    }
    if wrist.x < shoulder.x - thresholds.grip_inward_limit {
        violations.push(Violation::GripTooNarrow);
    }

    Evaluation::new(ExerciseKind::UprightRow, wrist.y, band, violations)
}

fn front_raise(joints: &JointSet, thresholds: &FrontRaiseThresholds) -> Evaluation {
    let (shoulder, elbow, _, hip) = positions(joints);
    let angle = checked_angle_at_vertex(elbow, shoulder, hip);

    let band = match angle {
        Some(angle) if angle < thresholds.down_angle => PhaseBand::Down,
        Some(angle) if angle > thresholds.up_min_angle && angle <= thresholds.up_max_angle => {
            PhaseBand::Up
        }
        _ => PhaseBand::Between,
    };

    let mut violations = Vec::new();
    if angle.is_some_and(|angle| angle > thresholds.up_max_angle) {
        violations.push(Violation::RaisedTooHigh);
    }
    if shoulder.x < hip.x - thresholds.lean_limit {
        violations.push(Violation::LeaningBack);
    }

    Evaluation::new(
        ExerciseKind::FrontRaise,
        angle.unwrap_or(DEGENERATE_ANGLE),
        band,
        violations,
    )
}

fn positions(joints: &JointSet) -> (Point2, Point2, Point2, Point2) {
    (
        joints.shoulder.position(),
        joints.elbow.position(),
        joints.wrist.position(),
        joints.hip.position(),
    )
}
