//! Point-and-shoot navigation using odometry.
//!
//! This module provides the [`PointShoot`] struct which combines the pose
//! from the odometry tracker with the motion primitives to enable simple
//! point-to-point navigation.
//!
//! The "point-and-shoot" approach rotates to face the target, then drives
//! straight to it. Both legs are planned from the pose at the start, so the
//! drive leg holds the heading the turn ended on.
//!
//! # Example
//!
//! ```ignore
//! use odonav::motion::odom::ptsht::PointShoot;
//!
//! let point_shoot = PointShoot::new(movement);
//!
//! // Navigate to a point
//! point_shoot.go_to_point(24.0, 24.0).await;
//!
//! // Navigate to a pose (position + heading)
//! point_shoot.goto_pose(48.0, 0.0, FRAC_PI_2).await;
//! ```

use log::info;

use crate::{
    drivetrain::DriveMotor,
    motion::pid::{Motion, Movement},
    time::Clock,
};

/// Point-and-shoot navigation controller.
///
/// Combines odometry feedback with the motion primitives for simple
/// point-to-point navigation. The robot rotates to face the target, then
/// drives straight to it.
pub struct PointShoot<M: 'static, C> {
    /// The primitives used for each leg.
    pub movement: Movement<M, C>,
}

impl<M: DriveMotor + 'static, C: Clock> PointShoot<M, C> {
    pub fn new(movement: Movement<M, C>) -> Self { Self { movement } }

    /// Rotates the robot to face a specific point on the field.
    ///
    /// A point at the robot's own position leaves it where it is.
    ///
    /// # Arguments
    ///
    /// * `x` - Target X coordinate in inches.
    /// * `y` - Target Y coordinate in inches.
    pub async fn face_point(&self, x: f64, y: f64) -> Motion {
        match self.movement.pose().bearing_to(x, y) {
            Some(bearing) => self.movement.turn_to(bearing).await,
            None => self.movement.done("face_point", 0, 0.0),
        }
    }

    /// Moves the robot to a specific point on the field.
    ///
    /// Bearing and distance are computed once, then the robot turns to the
    /// bearing and drives the distance. A stalled turn skips the drive. A
    /// point at the robot's own position does nothing.
    ///
    /// # Arguments
    ///
    /// * `x` - Target X coordinate in inches.
    /// * `y` - Target Y coordinate in inches.
    pub async fn go_to_point(&self, x: f64, y: f64) -> Motion {
        let pose = self.movement.pose();
        let Some(bearing) = pose.bearing_to(x, y) else {
            return self.movement.done("go_to_point", 0, 0.0);
        };
        let distance = pose.distance_to(x, y);
        info!("go_to_point: ({:.2}, {:.2}), {:.2} in at {:.3} rad", x, y, distance, bearing);

        let turn = self.movement.turn_to(bearing).await;
        if !turn.is_settled() {
            return turn;
        }
        self.movement.drive_straight(distance).await
    }

    /// Moves the robot to a specific pose (position and heading).
    ///
    /// Executes [`go_to_point`](Self::go_to_point) and then turns to the final
    /// heading.
    ///
    /// # Arguments
    ///
    /// * `x` - Target X coordinate in inches.
    /// * `y` - Target Y coordinate in inches.
    /// * `heading` - Final heading in radians.
    pub async fn goto_pose(&self, x: f64, y: f64, heading: f64) -> Motion {
        let reached = self.go_to_point(x, y).await;
        if !reached.is_settled() {
            return reached;
        }
        self.movement.turn_to(heading).await
    }

    /// Moves the robot forward in a straight line.
    ///
    /// Positive values move forward, negative values move backward.
    pub async fn travel(&self, distance: f64) -> Motion {
        self.movement.drive_straight(distance).await
    }
}

#[cfg(test)]
mod tests {
    use std::{f64::consts::FRAC_PI_2, time::Duration};

    use super::*;
    use crate::{
        motion::{math::angle_wrap, pid::profile::MotionProfile},
        sim::{SimClock, SimMotor, SimRobot},
    };

    fn setup() -> (SimRobot, PointShoot<SimMotor, SimClock>) {
        let robot = SimRobot::default();
        let clock = SimClock::new(&robot);
        let odom = clock.spawn_odometry(robot.tracker());
        let movement = Movement::from_tracker(&odom, MotionProfile::default(), clock);
        (robot, PointShoot::new(movement))
    }

    fn settle(nav: &PointShoot<SimMotor, SimClock>) {
        pollster::block_on(nav.movement.clock.sleep(Duration::from_millis(50)));
    }

    #[test]
    fn go_to_point_turns_then_drives() {
        let (_robot, nav) = setup();
        let report = pollster::block_on(nav.go_to_point(10.0, 10.0));
        assert!(report.is_settled());
        settle(&nav);
        let pose = nav.movement.pose();
        assert!(pose.distance_to(10.0, 10.0) < 1.0, "ended at {:?}", pose);
        assert!((pose.theta - std::f64::consts::FRAC_PI_4).abs() < 0.05);
    }

    #[test]
    fn zero_displacement_skips_both_legs() {
        let (robot, nav) = setup();
        let report = pollster::block_on(nav.go_to_point(0.0, 0.0));
        assert!(report.is_settled());
        assert!(robot.events().is_empty());
    }

    #[test]
    fn goto_pose_ends_on_heading() {
        let (_robot, nav) = setup();
        let report = pollster::block_on(nav.goto_pose(-12.0, 6.0, FRAC_PI_2));
        assert!(report.is_settled());
        settle(&nav);
        let pose = nav.movement.pose();
        assert!(pose.distance_to(-12.0, 6.0) < 1.0, "ended at {:?}", pose);
        assert!(angle_wrap(FRAC_PI_2 - pose.theta).abs() < 0.03);
    }

    #[test]
    fn face_point_only_rotates() {
        let (_robot, nav) = setup();
        pollster::block_on(nav.face_point(0.0, -30.0));
        settle(&nav);
        let pose = nav.movement.pose();
        assert!(angle_wrap(-FRAC_PI_2 - pose.theta).abs() < 0.03);
        assert!(pose.x.abs() < 1e-6 && pose.y.abs() < 1e-6);
    }

    #[test]
    fn stalled_turn_skips_drive() {
        let (robot, nav) = setup();
        robot.set_blocked(true);
        let report = pollster::block_on(nav.go_to_point(0.0, 24.0));
        assert!(!report.is_settled());
        assert!(nav.movement.clock.now() < Duration::from_secs(2));
    }
}
