use log::{debug, info};

use super::movement::{Motion, Movement, StallWatch};
use crate::{
    drivetrain::{DriveCommand, DriveMotor},
    motion::math::{abscap, angle_wrap, min_power, SlewLimiter},
    time::Clock,
};

impl<M: DriveMotor + 'static, C: Clock> Movement<M, C> {
    /// Drives `distance` inches along the current heading. Negative values
    /// drive backwards.
    ///
    /// Distance is measured on the drive encoders from where they read on
    /// entry; the encoders themselves are not reset, so the odometry tracker
    /// keeps its baselines. The heading at entry is held with a proportional
    /// correction applied in opposite directions to the two sides.
    ///
    /// A distance already within the stop zone returns at once without moving.
    pub async fn drive_straight(&self, distance: f64) -> Motion {
        let cfg = self.profile.straight;
        let (left0, right0) = self.wheel_travel().unwrap_or_default();
        let locked = self.pose().theta;
        let target = distance * cfg.correction_factor;

        let mut slew = cfg.slew_step.map(|step| (SlewLimiter::new(step), SlewLimiter::new(step)));
        let mut watch = StallWatch::new(cfg.stall, self.clock.now());
        let mut traveled = 0.0;
        let mut last = DriveCommand {
            left:  0.0,
            right: 0.0,
            unit:  cfg.unit,
        };

        info!("drive_straight: {:.2} in holding {:.3} rad", target, locked);
        loop {
            let cycles = watch.tick();
            if let Some((left, right)) = self.wheel_travel() {
                traveled = ((left - left0) + (right - right0)) / 2.0;
            }
            let err = target - traveled;

            if err.abs() < cfg.stop_zone {
                if cycles == 1 {
                    return self.done("drive_straight", cycles, err);
                }
                self.finish(last, cfg.brake).await;
                return self.done("drive_straight", cycles, err);
            }
            if watch.stalled(self.clock.now(), err.abs()) {
                return self.abort("drive_straight", cycles, err);
            }

            let power = if err.abs() > cfg.slow_zone { cfg.fast_power } else { cfg.slow_power };
            let base = min_power(err.signum() * power, err, cfg.min_power, cfg.stop_zone);
            let correction = cfg.heading_kp * angle_wrap(locked - self.pose().theta);
            let mut left = abscap(base - correction, cfg.max_power);
            let mut right = abscap(base + correction, cfg.max_power);
            if let Some((left_slew, right_slew)) = slew.as_mut() {
                left = left_slew.next(left);
                right = right_slew.next(right);
            }
            debug!("drive_straight: err {:.3} left {:.2} right {:.2}", err, left, right);

            last = DriveCommand {
                left,
                right,
                unit: cfg.unit,
            }
            .clamped();
            self.drivetrain.apply(last);
            self.clock.sleep(cfg.period).await;
        }
    }
}
