//! Landmark classification
//!
//! Turns one detection result from the external face detector into a raw
//! signal. Pure: no state, no side effects.

use crate::MonitorConfig;
use proctor_types::{RawSignal, ViolationType};
use serde::{Deserialize, Serialize};

/// Landmarks per face, in detector order
pub const LANDMARK_COUNT: usize = 6;

const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;
const LEFT_EAR: usize = 4;
const RIGHT_EAR: usize = 5;

/// Normalized image coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Landmarks of one detected face:
/// Left Eye, Right Eye, Mouth, Nose, Left Ear, Right Ear
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    pub points: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    fn x(&self, index: usize) -> Option<f64> {
        self.points.get(index).map(|p| p.x).filter(|x| x.is_finite())
    }
}

/// One detection result (zero or more faces)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub faces: Vec<FaceLandmarks>,
}

impl DetectionFrame {
    pub fn new(faces: Vec<FaceLandmarks>) -> Self {
        Self { faces }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Result of classifying one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Classification {
    pub signal: RawSignal,
    /// Near the gaze boundary; a confirmation from this frame is a warning
    pub borderline: bool,
    /// Landmarks were incomplete or non-finite
    pub undecodable: bool,
}

impl Classification {
    fn signal(signal: RawSignal) -> Self {
        Self {
            signal,
            ..Default::default()
        }
    }
}

/// Classify a single detection frame
pub fn classify(frame: &DetectionFrame, config: &MonitorConfig) -> Classification {
    let face = match frame.faces.as_slice() {
        [] => return Classification::signal(RawSignal::Violation(ViolationType::FaceNotDetected)),
        [face] => face,
        _ => return Classification::signal(RawSignal::Violation(ViolationType::MultipleFaces)),
    };

    let coords = if face.points.len() < LANDMARK_COUNT {
        None
    } else {
        face.x(LEFT_EYE)
            .zip(face.x(RIGHT_EYE))
            .zip(face.x(LEFT_EAR).zip(face.x(RIGHT_EAR)))
    };

    let Some(((left_eye, right_eye), (left_ear, right_ear))) = coords else {
        return Classification {
            undecodable: true,
            ..Default::default()
        };
    };

    let left_gap = left_eye - left_ear;
    let right_gap = right_ear - right_eye;

    if left_gap <= config.gaze_threshold {
        Classification {
            signal: RawSignal::Violation(ViolationType::LookingLeft),
            borderline: right_eye > config.left_warning_right_eye_x,
            undecodable: false,
        }
    } else if right_gap <= config.gaze_threshold {
        Classification {
            signal: RawSignal::Violation(ViolationType::LookingRight),
            borderline: left_eye < config.right_warning_left_eye_x,
            undecodable: false,
        }
    } else {
        Classification::default()
    }
}
