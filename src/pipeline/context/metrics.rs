use std::time::Duration;

/// Metrics collected during frame processing
#[derive(Debug, Clone, Default)]
pub struct FrameMetrics {
    gating_duration: Option<Duration>,
    evaluation_duration: Option<Duration>,
}

impl FrameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_gating_duration(&mut self, duration: Duration) {
        self.gating_duration = Some(duration);
    }

    pub fn record_evaluation_duration(&mut self, duration: Duration) {
        self.evaluation_duration = Some(duration);
    }

    pub fn gating_duration(&self) -> Option<Duration> {
        self.gating_duration
    }

    pub fn evaluation_duration(&self) -> Option<Duration> {
        self.evaluation_duration
    }
}
