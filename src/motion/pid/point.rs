use log::{debug, info};

use super::movement::{Motion, Movement, StallWatch};
use crate::{
    drivetrain::{DriveCommand, DriveMotor},
    motion::math::{abscap, angle_wrap, min_power},
    time::Clock,
};

impl<M: DriveMotor + 'static, C: Clock> Movement<M, C> {
    /// Drives to a field point in one continuous loop.
    ///
    /// Distance and bearing are recomputed from the live pose every cycle.
    /// While the heading error exceeds the turn threshold the robot turns in
    /// place; otherwise it drives forward with a steering term mixed into the
    /// two sides. Arrival is a distance below the configured tolerance.
    ///
    /// For a turn-then-drive approach see
    /// [`PointShoot::go_to_point`](crate::motion::odom::ptsht::PointShoot::go_to_point).
    pub async fn drive_to_point(&self, x: f64, y: f64) -> Motion {
        let cfg = self.profile.point;
        let mut watch = StallWatch::new(cfg.stall, self.clock.now());
        let mut last = DriveCommand {
            left:  0.0,
            right: 0.0,
            unit:  cfg.unit,
        };

        info!("drive_to_point: ({:.2}, {:.2})", x, y);
        loop {
            let cycles = watch.tick();
            let pose = self.pose();
            let dist = pose.distance_to(x, y);

            if dist < cfg.tolerance {
                if cycles > 1 {
                    self.finish(last, cfg.brake).await;
                }
                return self.done("drive_to_point", cycles, dist);
            }
            let heading_err = match pose.bearing_to(x, y) {
                Some(bearing) => angle_wrap(bearing - pose.theta),
                None => 0.0,
            };
            // Remaining wheel travel: distance plus the arc still to turn.
            let remaining = dist + heading_err.abs() * self.config.track_width / 2.0;
            if watch.stalled(self.clock.now(), remaining) {
                return self.abort("drive_to_point", cycles, dist);
            }

            let turn = abscap(cfg.kp_turn * heading_err, cfg.max_turn);
            let turn = abscap(
                min_power(turn, heading_err, cfg.min_turn, cfg.heading_tolerance),
                cfg.max_turn,
            );
            let (left, right) = if heading_err.abs() > cfg.turn_threshold {
                (-turn, turn)
            } else {
                let forward = abscap(cfg.kp_distance * dist, cfg.max_forward);
                let forward = min_power(forward, dist, cfg.min_forward, cfg.tolerance);
                (forward - turn, forward + turn)
            };
            debug!(
                "drive_to_point: dist {:.3} heading_err {:.3} left {:.2} right {:.2}",
                dist, heading_err, left, right
            );

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

#[cfg(test)]
mod tests {
    use std::{f64::consts::FRAC_PI_4, time::Duration};

    use super::*;
    use crate::{
        motion::pid::{movement::Outcome, profile::MotionProfile},
        sim::{SimClock, SimMotor, SimRobot},
    };

    fn setup() -> (SimRobot, Movement<SimMotor, SimClock>) {
        let robot = SimRobot::default();
        let clock = SimClock::new(&robot);
        let odom = clock.spawn_odometry(robot.tracker());
        let movement = Movement::from_tracker(&odom, MotionProfile::default(), clock);
        (robot, movement)
    }

    #[test]
    fn reaches_diagonal_point() {
        let (robot, movement) = setup();
        let report = pollster::block_on(movement.drive_to_point(10.0, 10.0));
        assert_eq!(report.outcome, Outcome::Settled);

        pollster::block_on(movement.clock.sleep(Duration::from_millis(50)));
        let pose = movement.pose();
        assert!(pose.distance_to(10.0, 10.0) < 0.6, "ended at {:?}", pose);
        assert!((pose.theta - FRAC_PI_4).abs() < 0.15, "heading {}", pose.theta);
        let truth = robot.true_pose();
        assert!((truth.x - pose.x).abs() < 0.01 && (truth.y - pose.y).abs() < 0.01);
    }

    #[test]
    fn turns_in_place_before_driving() {
        let (robot, movement) = setup();
        pollster::block_on(movement.drive_to_point(0.0, 20.0));
        // While more than the turn threshold off, the robot must not have
        // gone anywhere.
        let turning = robot
            .trace()
            .into_iter()
            .take_while(|s| (std::f64::consts::FRAC_PI_2 - s.pose.theta) > 0.3);
        for sample in turning {
            assert!(sample.pose.x.abs() < 0.1 && sample.pose.y.abs() < 0.1);
        }
        assert!(movement.pose().distance_to(0.0, 20.0) < 0.6);
    }

    #[test]
    fn already_there_returns_immediately() {
        let (robot, movement) = setup();
        let report = pollster::block_on(movement.drive_to_point(0.2, -0.1));
        assert_eq!(report.cycles, 1);
        assert!(report.is_settled());
        assert!(robot.events().is_empty());
    }

    #[test]
    fn blocked_robot_stalls() {
        let (robot, movement) = setup();
        robot.set_blocked(true);
        let report = pollster::block_on(movement.drive_to_point(10.0, 10.0));
        assert_eq!(report.outcome, Outcome::Stalled);
    }
}
