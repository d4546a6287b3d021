//! Optional temporal smoothing of joint positions ahead of the rules.
//!
//! Only positions are filtered; confidences always come from the current
//! frame so gating stays a per-frame decision.

use std::collections::VecDeque;

use crate::common::keypoint::{Joint, JointSet};
use crate::config::{SmoothingConfig, SmoothingStrategy};

pub trait KeypointSmoother: Send + Sync {
    fn smooth(&mut self, joints: JointSet) -> JointSet;
    fn reset(&mut self);
    fn name(&self) -> &'static str;
}

pub fn from_config(config: &SmoothingConfig) -> Box<dyn KeypointSmoother> {
    match config.strategy {
        SmoothingStrategy::None => Box::new(Passthrough),
        SmoothingStrategy::MovingAverage => Box::new(MovingAverage::new(config.window)),
        SmoothingStrategy::Median => Box::new(MedianFilter::new(config.window)),
    }
}

/// Per-frame evaluation, no history.
pub struct Passthrough;

impl KeypointSmoother for Passthrough {
    fn smooth(&mut self, joints: JointSet) -> JointSet {
        joints
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "Passthrough"
    }
}

/// Bounded history of the last `window` joint sets, newest last.
struct Window {
    capacity: usize,
    history: VecDeque<JointSet>,
}

impl Window {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, joints: JointSet) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(joints);
    }

    /// Rebuilds `current` with each joint position reduced over the window.
    fn reduce(&self, current: JointSet, reducer: impl Fn(&mut [f32]) -> f32) -> JointSet {
        let mut smoothed = current;
        let mut xs = Vec::with_capacity(self.history.len());
        let mut ys = Vec::with_capacity(self.history.len());
        for joint in Joint::ALL {
            xs.clear();
            ys.clear();
            for sample in &self.history {
                let keypoint = sample.get(joint);
                xs.push(keypoint.x);
                ys.push(keypoint.y);
            }
            let target = smoothed.get_mut(joint);
            target.x = reducer(&mut xs);
            target.y = reducer(&mut ys);
        }
        smoothed
    }
}

pub struct MovingAverage {
    window: Window,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            window: Window::new(window),
        }
    }
}

impl KeypointSmoother for MovingAverage {
    fn smooth(&mut self, joints: JointSet) -> JointSet {
        self.window.push(joints);
        self.window
            .reduce(joints, |values| values.iter().sum::<f32>() / values.len() as f32)
    }

    fn reset(&mut self) {
        self.window.history.clear();
    }

    fn name(&self) -> &'static str {
        "MovingAverage"
    }
}

/// Median over the window; rejects single-frame outliers outright.
pub struct MedianFilter {
    window: Window,
}

impl MedianFilter {
    pub fn new(window: usize) -> Self {
        Self {
            window: Window::new(window),
        }
    }
}

impl KeypointSmoother for MedianFilter {
    fn smooth(&mut self, joints: JointSet) -> JointSet {
        self.window.push(joints);
        self.window.reduce(joints, median)
    }

    fn reset(&mut self) {
        self.window.history.clear();
    }

    fn name(&self) -> &'static str {
        "Median"
    }
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
