use serde::{Deserialize, Serialize};

use crate::pipeline::domain::exercise::{AlertLevel, Stage};
use crate::pipeline::domain::rep_state::RepState;

/// RGB color of the feedback banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl DisplayColor {
    pub const GOOD: DisplayColor = DisplayColor { r: 0, g: 255, b: 0 };
    pub const WARNING: DisplayColor = DisplayColor { r: 255, g: 0, b: 0 };
    pub const READY: DisplayColor = DisplayColor { r: 0, g: 255, b: 255 };

    pub fn for_alert(alert: Option<AlertLevel>) -> Self {
        match alert {
            Some(AlertLevel::Ok) => Self::GOOD,
            Some(AlertLevel::Warning) => Self::WARNING,
            None => Self::READY,
        }
    }
}

/// Everything the overlay needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderingPayload {
    pub feedback: String,
    pub alert: Option<AlertLevel>,
    pub color: DisplayColor,
    pub rep_count: u32,
    pub set_count: u32,
    pub stage: Stage,
}

impl RenderingPayload {
    pub fn neutral() -> Self {
        Self::from(&RepState::new())
    }
}

impl From<&RepState> for RenderingPayload {
    fn from(state: &RepState) -> Self {
        Self {
            feedback: state.last_feedback().to_string(),
            alert: state.last_alert(),
            color: DisplayColor::for_alert(state.last_alert()),
            rep_count: state.rep_count(),
            set_count: state.set_count(),
            stage: state.stage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_payload_is_ready() {
        let payload = RenderingPayload::neutral();
        assert_eq!(payload.feedback, "READY?");
        assert_eq!(payload.color, DisplayColor::READY);
        assert_eq!((payload.rep_count, payload.set_count), (0, 0));
    }

    #[test]
    fn serializes_for_the_overlay() {
        let json = serde_json::to_value(RenderingPayload::neutral()).unwrap();
        assert_eq!(json["feedback"], "READY?");
        assert_eq!(json["alert"], serde_json::Value::Null);
        assert_eq!(json["color"]["b"], 255);
        assert_eq!(json["stage"], "down");
    }
}
