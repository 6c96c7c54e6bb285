//! Scalar helpers shared by the sweep, slope and motor code.

use glam::Vec2;

#[inline]
pub fn sign(x: f32) -> f32 {
    if x < 0.0 { -1.0 } else if x > 0.0 { 1.0 } else { 0.0 }
}

/// Like [`sign`], but zero counts as positive. Ray directions must never be 0.
#[inline]
pub fn direction_of(x: f32) -> f32 {
    if x < 0.0 { -1.0 } else { 1.0 }
}

/// Unsigned angle in degrees between a surface normal and world up.
#[inline]
pub fn surface_angle(normal: Vec2) -> f32 {
    let n = normal.normalize_or_zero();
    if n == Vec2::ZERO {
        return 0.0;
    }
    n.dot(Vec2::Y).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Critically damped approach of `current` toward `target`.
///
/// `velocity` carries the smoothing state between calls and must be kept by
/// the caller. Never overshoots the target.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut out = target + (change + temp) * decay;

    if (target - current > 0.0) == (out > target) {
        out = target;
        *velocity = 0.0;
    }
    out
}

/// Symmetric ease-in-out curve `x^a / (x^a + (1-x)^a)` with `a = ease_amount + 1`.
///
/// `ease_amount = 0` is linear.
#[inline]
pub fn ease(x: f32, ease_amount: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    let a = ease_amount + 1.0;
    let num = x.powf(a);
    num / (num + (1.0 - x).powf(a))
}
