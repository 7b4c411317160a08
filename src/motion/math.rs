//! Small numeric helpers shared by odometry and the motion primitives.

use std::f64::consts::{PI, TAU};

/// Below this length a displacement has no meaningful bearing.
pub const BEARING_EPSILON: f64 = 1e-9;

/// Wraps an angle in radians to `(-π, π]`.
///
/// Angles already in range come back bit-for-bit unchanged. Closed form, so
/// any finite input terminates; non-finite input is returned unchanged.
pub fn angle_wrap(a: f64) -> f64 {
    if !a.is_finite() || (a > -PI && a <= PI) {
        return a;
    }
    let wrapped = (a + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Limits `val` to `[-cap, cap]`.
pub fn abscap(val: f64, cap: f64) -> f64 {
    let cap = cap.abs();
    val.clamp(-cap, cap)
}

/// Raises `out` to `floor` (keeping its sign) while `err` is outside the stop
/// zone, so the drivetrain never sits below the power it needs to overcome
/// static friction.
///
/// An exactly zero `out` takes the sign of `err`.
pub fn min_power(out: f64, err: f64, floor: f64, stop_zone: f64) -> f64 {
    if err.abs() > stop_zone && out.abs() < floor {
        let sign = if out != 0.0 { out.signum() } else { err.signum() };
        sign * floor
    } else {
        out
    }
}

/// Bearing from the origin towards `(dx, dy)`, or `None` when the displacement
/// is too short to have one.
pub fn bearing(dx: f64, dy: f64) -> Option<f64> {
    if dx.hypot(dy) < BEARING_EPSILON {
        None
    } else {
        Some(dy.atan2(dx))
    }
}

/// Caps how much a commanded value may change between consecutive cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewLimiter {
    /// Largest allowed change per call to [`next`](Self::next).
    pub step:    f64,
    /// The last value produced.
    pub current: f64,
}

impl SlewLimiter {
    /// A limiter starting from zero.
    pub fn new(step: f64) -> Self {
        Self {
            step:    step.abs(),
            current: 0.0,
        }
    }

    /// Moves towards `target` by at most `step` and returns the new value.
    pub fn next(&mut self, target: f64) -> f64 {
        self.current = if target > self.current + self.step {
            self.current + self.step
        } else if target < self.current - self.step {
            self.current - self.step
        } else {
            target
        };
        self.current
    }
}
