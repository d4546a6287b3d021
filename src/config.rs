use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AppError;
use crate::pipeline::domain::exercise::ExerciseKind;

const ENV_PREFIX: &str = "REP_COACH";
const DEFAULT_CONFIG_FILE: &str = "rep-coach";

/// Process-wide settings, fixed at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    pub coach: CoachConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            coach: CoachConfig::default(),
            session: SessionConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from an optional TOML file and `REP_COACH__*`
    /// environment variables, environment taking precedence.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let file = config::File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE));
        let settings: Settings = config::Config::builder()
            .add_source(file.required(path.is_some()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate().map_err(AppError::InvalidConfig)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.coach.validate()?;
        self.session.validate()?;
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(format!("Unknown log level '{}'", self.log_level));
        }
        Ok(())
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// Tunables of the rep counter itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub reps_per_set: u32,
    pub confidence_threshold: f32,
    pub thresholds: ExerciseThresholds,
    pub smoothing: SmoothingConfig,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            reps_per_set: 10,
            confidence_threshold: 0.5,
            thresholds: ExerciseThresholds::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl CoachConfig {
    /// Tighter form tolerances
    pub fn strict() -> Self {
        Self {
            thresholds: ExerciseThresholds::strict(),
            ..Self::default()
        }
    }

    pub fn with_reps_per_set(mut self, reps_per_set: u32) -> Self {
        self.reps_per_set = reps_per_set;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.reps_per_set == 0 {
            return Err("Reps per set must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("Confidence threshold must be between 0.0 and 1.0".to_string());
        }

        self.thresholds.validate()?;
        self.smoothing.validate()
    }
}

/// Calibrated per-exercise thresholds, in degrees or frame pixels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseThresholds {
    pub bicep_curl: BicepCurlThresholds,
    pub upright_row: UprightRowThresholds,
    pub front_raise: FrontRaiseThresholds,
}

impl ExerciseThresholds {
    pub fn strict() -> Self {
        Self {
            bicep_curl: BicepCurlThresholds {
                max_sway: 35.0,
                ..BicepCurlThresholds::default()
            },
            upright_row: UprightRowThresholds {
                up_offset: 40.0,
                elbow_raise_limit: 20.0,
                ..UprightRowThresholds::default()
            },
            front_raise: FrontRaiseThresholds {
                up_max_angle: 95.0,
                ..FrontRaiseThresholds::default()
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let curl = &self.bicep_curl;
        if curl.up_angle >= curl.down_angle {
            return Err("Bicep curl up angle must be below its down angle".to_string());
        }

        let raise = &self.front_raise;
        if raise.down_angle >= raise.up_min_angle || raise.up_min_angle >= raise.up_max_angle {
            return Err("Front raise angles must satisfy down < up_min < up_max".to_string());
        }

        let angles = [
            curl.down_angle,
            curl.up_angle,
            raise.down_angle,
            raise.up_min_angle,
            raise.up_max_angle,
        ];
        if angles.iter().any(|angle| !(0.0..=180.0).contains(angle)) {
            return Err("Angle thresholds must be between 0 and 180 degrees".to_string());
        }

        let distances = [
            curl.max_sway,
            self.upright_row.up_offset,
            self.upright_row.elbow_raise_limit,
            self.upright_row.grip_inward_limit,
            raise.lean_limit,
        ];
        if distances.iter().any(|distance| !(distance.is_finite() && *distance >= 0.0)) {
            return Err("Pixel tolerances must be finite and not negative".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BicepCurlThresholds {
    /// Elbow angle above which the arm is at rest
    pub down_angle: f32,
    /// Elbow angle below which the curl is complete
    pub up_angle: f32,
    /// Horizontal shoulder-to-hip offset tolerated before the back counts as swinging
    pub max_sway: f32,
}

impl Default for BicepCurlThresholds {
    fn default() -> Self {
        Self {
            down_angle: 160.0,
            up_angle: 30.0,
            max_sway: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UprightRowThresholds {
    /// The pull is complete once the wrist is within this distance below the shoulder
    pub up_offset: f32,
    pub elbow_raise_limit: f32,
    pub grip_inward_limit: f32,
}

impl Default for UprightRowThresholds {
    fn default() -> Self {
        Self {
            up_offset: 50.0,
            elbow_raise_limit: 30.0,
            grip_inward_limit: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontRaiseThresholds {
    pub down_angle: f32,
    pub up_min_angle: f32,
    /// Inclusive; anything higher is an overshoot
    pub up_max_angle: f32,
    pub lean_limit: f32,
}

impl Default for FrontRaiseThresholds {
    fn default() -> Self {
        Self {
            down_angle: 20.0,
            up_min_angle: 80.0,
            up_max_angle: 100.0,
            lean_limit: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingStrategy {
    None,
    MovingAverage,
    Median,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub strategy: SmoothingStrategy,
    pub window: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            strategy: SmoothingStrategy::None,
            window: 5,
        }
    }
}

impl SmoothingConfig {
    pub fn moving_average(window: usize) -> Self {
        Self {
            strategy: SmoothingStrategy::MovingAverage,
            window,
        }
    }

    pub fn median(window: usize) -> Self {
        Self {
            strategy: SmoothingStrategy::Median,
            window,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.strategy != SmoothingStrategy::None && self.window == 0 {
            return Err("Smoothing window must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub frame_buffer_size: usize,
    pub frame_timeout_ms: Option<u64>,
    pub initial_exercise: ExerciseKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_buffer_size: 60,
            frame_timeout_ms: None,
            initial_exercise: ExerciseKind::BicepCurl,
        }
    }
}

impl SessionConfig {
    pub fn frame_timeout(&self) -> Option<Duration> {
        self.frame_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.frame_buffer_size == 0 {
            return Err("Frame buffer size must be greater than 0".to_string());
        }
        if self.frame_timeout_ms == Some(0) {
            return Err("Frame timeout must be greater than 0 when set".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Serve over TCP on this port; stdin/stdout otherwise
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
        assert!(CoachConfig::strict().validate().is_ok());
    }

    #[test]
    fn strict_preset_tightens_tolerances() {
        let strict = ExerciseThresholds::strict();
        let standard = ExerciseThresholds::default();
        assert!(strict.bicep_curl.max_sway < standard.bicep_curl.max_sway);
        assert!(strict.upright_row.up_offset < standard.upright_row.up_offset);
        assert!(strict.front_raise.up_max_angle < standard.front_raise.up_max_angle);
    }

    #[test]
    fn rejects_zero_reps_per_set() {
        let config = CoachConfig::default().with_reps_per_set(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_curl_band() {
        let mut config = CoachConfig::default();
        config.thresholds.bicep_curl.up_angle = 170.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_nan_and_negative_pixel_tolerances() {
        let mut config = CoachConfig::default();
        config.thresholds.bicep_curl.max_sway = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = CoachConfig::default();
        config.thresholds.upright_row.up_offset = -5.0;
        assert!(config.validate().is_err());

        let mut config = CoachConfig::default();
        config.thresholds.front_raise.lean_limit = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_smoothing_window() {
        let config = CoachConfig::default().with_smoothing(SmoothingConfig::median(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let settings = Settings {
            log_level: "chatty".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[coach]\nreps_per_set = 12\n[coach.thresholds.bicep_curl]\nmax_sway = 35.0\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.coach.reps_per_set, 12);
        assert_eq!(settings.coach.thresholds.bicep_curl.max_sway, 35.0);
        assert_eq!(settings.coach.thresholds.bicep_curl.down_angle, 160.0);
        assert_eq!(settings.coach.confidence_threshold, 0.5);
        assert_eq!(settings.server.port, None);
    }
}
