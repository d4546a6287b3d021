//! Planar joint geometry.

use serde::{Deserialize, Serialize};

/// Returned by [`angle_at_vertex`] when one of the rays has zero length.
pub const DEGENERATE_ANGLE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Interior angle at `b`, in degrees within [0, 180], between the rays
/// `b -> a` and `b -> c`.
///
/// Degenerate input yields [`DEGENERATE_ANGLE`] instead of NaN.
pub fn angle_at_vertex(a: Point2, b: Point2, c: Point2) -> f32 {
    checked_angle_at_vertex(a, b, c).unwrap_or(DEGENERATE_ANGLE)
}

/// Same as [`angle_at_vertex`] but reports degenerate input as `None`, so a
/// real 0° can be told apart from the sentinel.
pub fn checked_angle_at_vertex(a: Point2, b: Point2, c: Point2) -> Option<f32> {
    let ray_a = (a.x - b.x, a.y - b.y);
    let ray_c = (c.x - b.x, c.y - b.y);

    if !is_usable_ray(ray_a) || !is_usable_ray(ray_c) {
        return None;
    }

    let radians = ray_c.1.atan2(ray_c.0) - ray_a.1.atan2(ray_a.0);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    Some(angle.clamp(0.0, 180.0))
}

fn is_usable_ray(ray: (f32, f32)) -> bool {
    ray.0.is_finite() && ray.1.is_finite() && (ray.0 != 0.0 || ray.1 != 0.0)
}
