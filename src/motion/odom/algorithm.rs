use super::devices::{HeadingMode, Pose};
use crate::motion::math::angle_wrap;

/// One cycle's raw readings, already converted to inches and radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sample {
    pub left:        f64,
    pub right:       f64,
    pub raw_heading: f64,
}

/// The previous cycle's readings plus the accumulated (unwrapped) heading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Baseline {
    pub left:        f64,
    pub right:       f64,
    pub raw_heading: f64,
    pub heading:     f64,
}

impl Baseline {
    /// A baseline that treats `sample` as "no motion yet" at `heading`.
    pub fn at(sample: Sample, heading: f64) -> Self {
        Self {
            left: sample.left,
            right: sample.right,
            raw_heading: sample.raw_heading,
            heading,
        }
    }
}

/// Dead-reckons one cycle.
///
/// The forward displacement is the mean of both wheel deltas; the heading
/// change is the shortest-path difference of the raw gyro readings so a raw
/// value crossing its own wrap boundary does not look like a full turn. The
/// displacement is applied along the midpoint heading of the cycle.
pub(crate) fn integrate(
    pose: Pose,
    baseline: &mut Baseline,
    sample: Sample,
    mode: HeadingMode,
) -> Pose {
    let delta_left = sample.left - baseline.left;
    let delta_right = sample.right - baseline.right;
    let ds = (delta_left + delta_right) / 2.0;

    let delta_t = angle_wrap(sample.raw_heading - baseline.raw_heading);
    let avg_t = baseline.heading + delta_t / 2.0;

    *baseline = Baseline::at(sample, baseline.heading + delta_t);

    let (dx, dy) = rotate_vec(ds, 0.0, avg_t);
    Pose::new(pose.x + dx, pose.y + dy, mode.apply(baseline.heading))
}

/// Rotates a robot-frame vector into the field frame.
fn rotate_vec(x: f64, y: f64, t: f64) -> (f64, f64) {
    let new_x = x * t.cos() - y * t.sin();
    let new_y = x * t.sin() + y * t.cos();
    (new_x, new_y)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    const TOLERANCE: f64 = 1e-10;

    fn sample(left: f64, right: f64, raw_heading: f64) -> Sample {
        Sample {
            left,
            right,
            raw_heading,
        }
    }

    #[test]
    fn rotate_vec_test_basic() {
        let (new_x, new_y) = rotate_vec(1.0, 3.0, FRAC_PI_2);
        assert!((new_x + 3.0).abs() < TOLERANCE);
        assert!((new_y - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn no_motion_leaves_pose_unchanged() {
        let start = Pose::new(4.0, -2.0, 0.7);
        let s = sample(10.0, 12.0, 1.3);
        let mut baseline = Baseline::at(s, 0.7);
        let pose = integrate(start, &mut baseline, s, HeadingMode::Wrapped);
        assert_eq!(pose, start);
        let pose = integrate(pose, &mut baseline, s, HeadingMode::Wrapped);
        assert_eq!(pose, start);
    }

    #[test]
    fn straight_move_follows_heading() {
        let mut baseline = Baseline::at(sample(0.0, 0.0, 0.0), FRAC_PI_2);
        let pose = integrate(
            Pose::new(0.0, 0.0, FRAC_PI_2),
            &mut baseline,
            sample(5.0, 5.0, 0.0),
            HeadingMode::Wrapped,
        );
        assert!(pose.x.abs() < TOLERANCE);
        assert!((pose.y - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn unequal_wheels_average() {
        let mut baseline = Baseline::default();
        let pose = integrate(
            Pose::origin(),
            &mut baseline,
            sample(2.0, 4.0, 0.0),
            HeadingMode::Wrapped,
        );
        assert!((pose.x - 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn raw_wrap_crossing_is_a_small_turn() {
        // Bounded sensor reading just below 2π then just above 0.
        let mut baseline = Baseline::at(sample(0.0, 0.0, 2.0 * PI - 0.05), -0.05);
        let pose = integrate(
            Pose::new(0.0, 0.0, -0.05),
            &mut baseline,
            sample(0.0, 0.0, 0.05),
            HeadingMode::Unwrapped,
        );
        assert!((pose.theta - 0.05).abs() < 1e-9);
        assert!((baseline.heading - 0.05).abs() < 1e-9);
    }

    #[test]
    fn unwrapped_mode_accumulates_full_turns() {
        let mut baseline = Baseline::default();
        let mut pose = Pose::origin();
        let mut raw = 0.0;
        for _ in 0..80 {
            raw = angle_wrap(raw + 0.1 * PI);
            pose = integrate(pose, &mut baseline, sample(0.0, 0.0, raw), HeadingMode::Unwrapped);
        }
        assert!((pose.theta - 8.0 * PI).abs() < 1e-9);

        let mut wrapped_baseline = Baseline::default();
        let mut wrapped = Pose::origin();
        let mut raw = 0.0;
        for _ in 0..80 {
            raw = angle_wrap(raw + 0.1 * PI);
            wrapped = integrate(
                wrapped,
                &mut wrapped_baseline,
                sample(0.0, 0.0, raw),
                HeadingMode::Wrapped,
            );
        }
        assert!(wrapped.theta.abs() < 1e-9);
    }
}
