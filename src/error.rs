use thiserror::Error;
use uuid::Uuid;

use crate::common::keypoint::Joint;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to bind to port {1}: {0}")]
    Bind(std::io::Error, u16),
    #[error("Failed to accept connection: {0}")]
    Accept(std::io::Error),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Codec Error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Session {0} is closed")]
    SessionClosed(Uuid),
    #[error("Session {0} did not answer in time")]
    SessionTimeout(Uuid),
    #[error("Session Error: {0}")]
    Session(String),
}

// Per-frame failures. None of these escape the frame coordinator: each one
// means "nothing usable was detected in this frame".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("No person detected")]
    NoDetection,
    #[error("{joint:?} confidence {confidence:.2} below threshold")]
    LowConfidence { joint: Joint, confidence: f32 },
    #[error("Malformed keypoints: {0}")]
    MalformedKeypoints(String),
}
