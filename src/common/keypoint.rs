use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::geometry::Point2;
use crate::error::FrameError;

/// Right-side body joints read by the exercise rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Joint {
    Shoulder,
    Elbow,
    Wrist,
    Hip,
}

impl Joint {
    pub const ALL: [Joint; 4] = [Joint::Shoulder, Joint::Elbow, Joint::Wrist, Joint::Hip];

    /// Index of the joint in the COCO-17 keypoint numbering emitted by the pose model.
    pub fn coco_index(&self) -> usize {
        match self {
            Joint::Shoulder => 6,
            Joint::Elbow => 8,
            Joint::Wrist => 10,
            Joint::Hip => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    fn is_well_formed(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

impl From<[f32; 3]> for Keypoint {
    fn from(raw: [f32; 3]) -> Self {
        Self::new(raw[0], raw[1], raw[2])
    }
}

/// The pose model output for a single processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointFrame {
    frame_id: Uuid,
    captured_at: DateTime<Utc>,
    person: Option<Vec<Keypoint>>,
}

impl KeypointFrame {
    pub fn new(person: Option<Vec<Keypoint>>, captured_at: DateTime<Utc>) -> Self {
        Self {
            frame_id: Uuid::new_v4(),
            captured_at,
            person,
        }
    }

    pub fn detected(keypoints: Vec<Keypoint>) -> Self {
        Self::new(Some(keypoints), Utc::now())
    }

    pub fn empty() -> Self {
        Self::new(None, Utc::now())
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn person(&self) -> Option<&[Keypoint]> {
        self.person.as_deref()
    }
}

/// The joints one evaluation reads, extracted from a detected person.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointSet {
    pub shoulder: Keypoint,
    pub elbow: Keypoint,
    pub wrist: Keypoint,
    pub hip: Keypoint,
}

impl JointSet {
    /// Extracts the joint set, checking presence and confidence of the
    /// `required` joints only. Joints that are not required fall back to a
    /// zero-confidence keypoint when absent.
    pub fn extract(
        person: &[Keypoint],
        required: &[Joint],
        confidence_threshold: f32,
    ) -> Result<Self, FrameError> {
        for joint in required {
            let keypoint = lookup(person, *joint)?;
            if keypoint.confidence < confidence_threshold {
                return Err(FrameError::LowConfidence {
                    joint: *joint,
                    confidence: keypoint.confidence,
                });
            }
        }

        let or_default = |joint: Joint| person.get(joint.coco_index()).copied().unwrap_or_default();
        Ok(Self {
            shoulder: or_default(Joint::Shoulder),
            elbow: or_default(Joint::Elbow),
            wrist: or_default(Joint::Wrist),
            hip: or_default(Joint::Hip),
        })
    }

    pub fn get(&self, joint: Joint) -> Keypoint {
        match joint {
            Joint::Shoulder => self.shoulder,
            Joint::Elbow => self.elbow,
            Joint::Wrist => self.wrist,
            Joint::Hip => self.hip,
        }
    }

    pub fn get_mut(&mut self, joint: Joint) -> &mut Keypoint {
        match joint {
            Joint::Shoulder => &mut self.shoulder,
            Joint::Elbow => &mut self.elbow,
            Joint::Wrist => &mut self.wrist,
            Joint::Hip => &mut self.hip,
        }
    }
}

fn lookup(person: &[Keypoint], joint: Joint) -> Result<Keypoint, FrameError> {
    let keypoint = person.get(joint.coco_index()).copied().ok_or_else(|| {
        FrameError::MalformedKeypoints(format!(
            "{:?} (index {}) missing from {} keypoints",
            joint,
            joint.coco_index(),
            person.len()
        ))
    })?;
    if !keypoint.is_well_formed() {
        return Err(FrameError::MalformedKeypoints(format!(
            "{:?} has invalid values {:?}",
            joint, keypoint
        )));
    }
    Ok(keypoint)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a COCO-17 person with the four right-side joints placed and
    /// every other keypoint left at zero confidence.
    pub(crate) fn person(
        shoulder: (f32, f32),
        elbow: (f32, f32),
        wrist: (f32, f32),
        hip: (f32, f32),
        confidence: f32,
    ) -> Vec<Keypoint> {
        let mut keypoints = vec![Keypoint::default(); 17];
        keypoints[6] = Keypoint::new(shoulder.0, shoulder.1, confidence);
        keypoints[8] = Keypoint::new(elbow.0, elbow.1, confidence);
        keypoints[10] = Keypoint::new(wrist.0, wrist.1, confidence);
        keypoints[12] = Keypoint::new(hip.0, hip.1, confidence);
        keypoints
    }

    #[test]
    fn extracts_right_side_joints() {
        let keypoints = person((100.0, 100.0), (100.0, 200.0), (100.0, 300.0), (110.0, 320.0), 0.9);
        let joints = JointSet::extract(&keypoints, &Joint::ALL, 0.5).unwrap();
        assert_eq!(joints.shoulder, Keypoint::new(100.0, 100.0, 0.9));
        assert_eq!(joints.hip.x, 110.0);
        assert_eq!(joints.get(Joint::Wrist).y, 300.0);
    }

    #[test]
    fn low_confidence_required_joint_is_rejected() {
        let mut keypoints = person((0.0, 0.0), (0.0, 10.0), (0.0, 20.0), (0.0, 30.0), 0.9);
        keypoints[8].confidence = 0.3;
        let result = JointSet::extract(&keypoints, &Joint::ALL, 0.5);
        assert_eq!(
            result,
            Err(FrameError::LowConfidence {
                joint: Joint::Elbow,
                confidence: 0.3
            })
        );
    }

    #[test]
    fn low_confidence_optional_joint_is_ignored() {
        let mut keypoints = person((0.0, 0.0), (0.0, 10.0), (0.0, 20.0), (0.0, 30.0), 0.9);
        keypoints[10].confidence = 0.1;
        let required = [Joint::Shoulder, Joint::Elbow, Joint::Hip];
        assert!(JointSet::extract(&keypoints, &required, 0.5).is_ok());
    }

    #[test]
    fn truncated_person_is_malformed() {
        let keypoints = vec![Keypoint::new(1.0, 1.0, 1.0); 7];
        let result = JointSet::extract(&keypoints, &Joint::ALL, 0.5);
        assert!(matches!(result, Err(FrameError::MalformedKeypoints(_))));
    }

    #[test]
    fn non_finite_coordinates_are_malformed() {
        let mut keypoints = person((0.0, 0.0), (0.0, 10.0), (0.0, 20.0), (0.0, 30.0), 0.9);
        keypoints[6].x = f32::NAN;
        let result = JointSet::extract(&keypoints, &Joint::ALL, 0.5);
        assert!(matches!(result, Err(FrameError::MalformedKeypoints(_))));
    }
}
