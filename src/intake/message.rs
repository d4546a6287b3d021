use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::keypoint::{Keypoint, KeypointFrame};
use crate::pipeline::domain::ExerciseKind;

/// One inbound line of the JSON protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntakeMessage {
    /// Pose model output; `null` keypoints mean nobody was detected.
    Frame {
        keypoints: Option<Vec<[f32; 3]>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        captured_at: Option<DateTime<Utc>>,
    },
    Select {
        exercise: ExerciseKind,
    },
    Reset,
    Shutdown,
}

impl IntakeMessage {
    pub fn frame(keypoints: Option<Vec<[f32; 3]>>) -> Self {
        IntakeMessage::Frame {
            keypoints,
            captured_at: None,
        }
    }
}

impl KeypointFrame {
    /// Builds a frame from wire keypoints, stamping it now when the sender
    /// gave no capture time.
    pub fn from_wire(keypoints: Option<Vec<[f32; 3]>>, captured_at: Option<DateTime<Utc>>) -> Self {
        let person = keypoints.map(|keypoints| keypoints.into_iter().map(Keypoint::from).collect());
        KeypointFrame::new(person, captured_at.unwrap_or_else(Utc::now))
    }
}
