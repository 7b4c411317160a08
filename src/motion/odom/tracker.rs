//! Odometry tracking controller.
//!
//! This module provides the [`OdomTracker`] struct which dead-reckons the
//! robot's pose from the drive motor encoders and a gyroscopic heading.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//!
//! use odonav::motion::odom::{devices::DrivetrainConfig, tracker::OdomTracker};
//!
//! let odom = Rc::new(OdomTracker::new(drivetrain.clone(), imu, DrivetrainConfig::default()));
//! odom.reset_pose(&clock).await;
//! odom.init(); // spawn the background tracking task
//!
//! let pose = odom.pose();
//! println!("Position: ({}, {})", pose.x, pose.y);
//! ```

use std::{cell::RefCell, time::Duration};

use humantime::format_duration;
use log::{info, warn};

use super::{
    algorithm::{self, Baseline, Sample},
    devices::{DrivetrainConfig, HeadingMode, HeadingSensor, Pose, SharedPose},
};
use crate::{
    drivetrain::{Differential, DriveMotor},
    time::Clock,
};

/// Period of the background tracking task.
pub const ODOM_PERIOD: Duration = Duration::from_millis(10);

/// How often [`OdomTracker::reset_pose`] polls a calibrating sensor.
const CALIBRATION_POLL: Duration = Duration::from_millis(10);

/// Longest [`OdomTracker::reset_pose`] waits for the heading sensor.
pub const CALIBRATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Odometry position tracker.
///
/// The tracker is the sole writer of its [`SharedPose`]. Call
/// [`poll`](Self::poll) once per [`ODOM_PERIOD`] (the [`run`](Self::run) loop
/// does exactly that) and read the result from anywhere with
/// [`pose`](Self::pose) or a clone of [`shared_pose`](Self::shared_pose).
pub struct OdomTracker<M: 'static, H> {
    /// Drivetrain whose motor encoders measure wheel travel.
    pub drivetrain:   Differential<M>,
    /// Wheel geometry used to convert encoder degrees to inches.
    pub config:       DrivetrainConfig,
    /// Whether the reported heading is wrapped or continuous.
    pub heading_mode: HeadingMode,
    imu:              RefCell<H>,
    baseline:         RefCell<Baseline>,
    global_pose:      SharedPose,
}

impl<M: DriveMotor + 'static, H: HeadingSensor> OdomTracker<M, H> {
    /// Creates a new tracker starting at the origin, facing +x.
    ///
    /// The current sensor readings become the baseline, so whatever the
    /// encoders read now counts as "no motion yet".
    pub fn new(drivetrain: Differential<M>, imu: H, config: DrivetrainConfig) -> Self {
        Self::from_pose(drivetrain, imu, config, Pose::origin())
    }

    /// Creates a new tracker starting at a specific pose.
    pub fn from_pose(
        drivetrain: Differential<M>,
        imu: H,
        config: DrivetrainConfig,
        pose: Pose,
    ) -> Self {
        let tracker = Self {
            drivetrain,
            config,
            heading_mode: HeadingMode::default(),
            imu: RefCell::new(imu),
            baseline: RefCell::new(Baseline::default()),
            global_pose: SharedPose::new(pose),
        };
        tracker.reset_pose_to(pose);
        tracker
    }

    /// Selects wrapped or continuous heading reporting.
    pub fn with_heading_mode(mut self, mode: HeadingMode) -> Self {
        self.heading_mode = mode;
        let pose = self.pose();
        self.reset_pose_to(pose);
        self
    }

    /// A snapshot of the current pose.
    pub fn pose(&self) -> Pose { self.global_pose.get() }

    /// A read handle on the pose record.
    pub fn shared_pose(&self) -> SharedPose { self.global_pose.clone() }

    /// Whether the heading sensor is still calibrating.
    ///
    /// A sensor that cannot be read counts as calibrating.
    pub fn is_calibrating(&self) -> bool {
        self.imu.borrow().is_calibrating().unwrap_or_else(|e| {
            warn!("IMU Calibration State Error: {}", e);
            true
        })
    }

    /// Runs one estimator cycle.
    ///
    /// Never fails: a device that cannot be read contributes no motion for
    /// this cycle.
    pub fn step(&self) {
        let mut baseline = self.baseline.borrow_mut();
        let sample = self.sample(&baseline);
        let pose = algorithm::integrate(self.pose(), &mut baseline, sample, self.heading_mode);
        self.global_pose.set(pose);
    }

    /// Runs [`step`](Self::step) unless the heading sensor is calibrating.
    ///
    /// Returns whether a step ran.
    pub fn poll(&self) -> bool {
        if self.is_calibrating() {
            return false;
        }
        self.step();
        true
    }

    /// The tracking loop: polls once per `period`, forever.
    pub async fn run<C: Clock>(&self, clock: &C, period: Duration) {
        info!("Odometry Tracking Started");
        loop {
            self.poll();
            clock.sleep(period).await;
        }
    }

    /// Zeroes the encoders, pose and heading reference, then waits for the
    /// heading sensor to finish calibrating.
    ///
    /// The wait gives up after [`CALIBRATION_TIMEOUT`], so a sensor that stays
    /// busy or cannot be read does not hang the caller. A failed encoder reset
    /// is harmless: the pose is re-anchored on whatever the encoders read.
    pub async fn reset_pose<C: Clock>(&self, clock: &C) {
        if let Err(e) = self.drivetrain.reset_position() {
            warn!("Encoder reset failed, re-anchoring on current readings: {}", e);
        }
        if let Err(e) = self.imu.borrow_mut().reset_heading() {
            warn!("IMU Heading Reset Error: {}", e);
        }
        self.reset_pose_to(Pose::origin());

        let start = clock.now();
        let mut announced = false;
        loop {
            let state = self.imu.borrow().is_calibrating();
            if let Ok(false) = state {
                break;
            }
            let waited = clock.now().saturating_sub(start);
            if waited >= CALIBRATION_TIMEOUT {
                match state {
                    Err(e) => warn!(
                        "IMU unreadable for {}, continuing: {}",
                        format_duration(waited),
                        e
                    ),
                    _ => warn!(
                        "IMU still calibrating after {}, continuing",
                        format_duration(waited)
                    ),
                }
                break;
            }
            if !announced {
                info!("Waiting for IMU calibration");
                announced = true;
            }
            clock.sleep(CALIBRATION_POLL).await;
        }

        // The heading reference may have moved while settling.
        self.reset_pose_to(Pose::origin());
        info!("Odometry reset to origin");
    }

    /// Re-anchors the pose without touching any hardware.
    ///
    /// The current encoder and heading readings become the new baseline.
    pub fn reset_pose_to(&self, pose: Pose) {
        let mut baseline = self.baseline.borrow_mut();
        let sample = self.sample(&baseline);
        *baseline = Baseline::at(sample, pose.theta);
        self.global_pose.set(Pose::new(
            pose.x,
            pose.y,
            self.heading_mode.apply(pose.theta),
        ));
    }

    /// Resets the position to the origin with heading 0.
    pub fn reset_origin(&self) { self.reset_pose_to(Pose::origin()); }

    fn sample(&self, previous: &Baseline) -> Sample {
        let (left, right) = match self.drivetrain.position() {
            Ok((left_deg, right_deg)) => (
                self.config.degrees_to_inches(left_deg),
                self.config.degrees_to_inches(right_deg),
            ),
            Err(e) => {
                warn!("Drive Encoder Error: {}", e);
                (previous.left, previous.right)
            }
        };
        let raw_heading = self.imu.borrow().heading().unwrap_or_else(|e| {
            warn!("IMU Error: {}", e);
            previous.raw_heading
        });
        Sample {
            left,
            right,
            raw_heading,
        }
    }
}

#[cfg(feature = "vexide")]
impl<M: DriveMotor + 'static, H: HeadingSensor + 'static> OdomTracker<M, H> {
    /// Spawns the tracking loop as a detached background task.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let odom = Rc::new(OdomTracker::new(drivetrain, imu, config));
    /// odom.init(); // Start the tracking loop
    /// ```
    pub fn init(self: &std::rc::Rc<Self>) { crate::hardware::spawn_odometry(self.clone()); }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;
    use crate::sim::{SimClock, SimRobot};

    const TOLERANCE: f64 = 1e-6;

    #[test]
    fn step_at_rest_is_idempotent() {
        let robot = SimRobot::default();
        let odom = robot.tracker();
        odom.reset_pose_to(Pose::new(3.0, -1.0, 0.4));
        let before = odom.pose();
        for _ in 0..50 {
            odom.step();
        }
        assert_eq!(odom.pose(), before);
    }

    #[test]
    fn poll_skips_while_calibrating() {
        let robot = SimRobot::default();
        robot.start_calibration(Duration::from_millis(100));
        let odom = robot.tracker();
        assert!(!odom.poll());
        robot.advance(Duration::from_millis(150));
        assert!(odom.poll());
    }

    #[test]
    fn tracks_straight_drive() {
        let robot = SimRobot::default();
        let odom = robot.tracker();
        robot.set_pose(Pose::new(0.0, 0.0, FRAC_PI_2));
        odom.reset_pose_to(Pose::new(0.0, 0.0, FRAC_PI_2));

        robot.drivetrain().set_power(6.0, 6.0, crate::drivetrain::PowerUnit::Voltage);
        for _ in 0..100 {
            robot.advance(ODOM_PERIOD);
            odom.step();
        }
        // 5 V above static friction for 1 s, less the 20 ms spin-up lag.
        let cfg = robot.config();
        let speed = 200.0 / 60.0 * cfg.gear_ratio() * cfg.circumference() * 5.0 / 11.0;
        let expected = speed * (1.0 - 0.02);
        let truth = robot.true_pose();
        let pose = odom.pose();
        assert!((truth.y - expected).abs() < 0.05, "y {} vs {}", truth.y, expected);
        assert!((pose.x - truth.x).abs() < 1e-3);
        assert!((pose.y - truth.y).abs() < 1e-3);
        assert!((pose.theta - FRAC_PI_2).abs() < TOLERANCE);
    }

    #[test]
    fn tracks_an_arc() {
        let robot = SimRobot::default();
        let odom = robot.tracker();
        robot.drivetrain().set_power(4.0, 8.0, crate::drivetrain::PowerUnit::Voltage);
        for _ in 0..150 {
            robot.advance(ODOM_PERIOD);
            odom.step();
        }
        let truth = robot.true_pose();
        let pose = odom.pose();
        assert!((pose.x - truth.x).abs() < 0.05, "x {} vs {}", pose.x, truth.x);
        assert!((pose.y - truth.y).abs() < 0.05, "y {} vs {}", pose.y, truth.y);
    }

    #[test]
    fn unwrapped_heading_counts_full_turns() {
        let robot = SimRobot::default();
        let odom = robot.tracker().with_heading_mode(HeadingMode::Unwrapped);
        robot.drivetrain().set_power(-8.0, 8.0, crate::drivetrain::PowerUnit::Voltage);
        while robot.true_pose().theta < 3.0 * PI {
            robot.advance(ODOM_PERIOD);
            odom.step();
        }
        assert!(odom.pose().theta > 2.5 * PI);
        assert!((odom.pose().theta - robot.true_pose().theta).abs() < 1e-6);
    }

    #[test]
    fn reset_pose_waits_for_calibration() {
        let robot = SimRobot::default();
        let clock = SimClock::new(&robot);
        let odom = robot.tracker();
        robot.drivetrain().set_power(6.0, 6.0, crate::drivetrain::PowerUnit::Voltage);
        robot.advance(Duration::from_millis(500));
        odom.step();
        assert!(odom.pose().x > 1.0);

        robot.drivetrain().stop(crate::drivetrain::StopMode::Hold);
        robot.start_calibration(Duration::from_millis(200));
        let start = clock.now();
        pollster::block_on(odom.reset_pose(&clock));
        assert!(clock.now() - start >= Duration::from_millis(200));
        assert!(!odom.is_calibrating());
        assert_eq!(odom.pose(), Pose::origin());

        odom.step();
        assert_eq!(odom.pose(), Pose::origin());
    }

    #[test]
    fn reset_pose_gives_up_on_endless_calibration() {
        let robot = SimRobot::default();
        let clock = SimClock::new(&robot);
        let odom = robot.tracker();
        robot.start_calibration(Duration::from_secs(60));
        pollster::block_on(odom.reset_pose(&clock));
        let waited = clock.now();
        assert!(waited >= CALIBRATION_TIMEOUT);
        assert!(waited < CALIBRATION_TIMEOUT + Duration::from_millis(50));
        assert_eq!(odom.pose(), Pose::origin());
    }

    #[test]
    fn reset_pose_survives_disconnected_devices() {
        let robot = SimRobot::default();
        let clock = SimClock::new(&robot);
        let odom = robot.tracker();
        robot.drivetrain().set_power(6.0, 6.0, crate::drivetrain::PowerUnit::Voltage);
        robot.advance(Duration::from_millis(300));
        robot.drivetrain().stop(crate::drivetrain::StopMode::Hold);

        robot.set_disconnected(true);
        pollster::block_on(odom.reset_pose(&clock));
        assert!(clock.now() >= CALIBRATION_TIMEOUT);
        assert_eq!(odom.pose(), Pose::origin());

        // The encoders were never zeroed; re-anchoring after reconnecting
        // still starts from the origin.
        robot.set_disconnected(false);
        odom.reset_origin();
        assert!(robot.drivetrain().position().unwrap().0 > 0.0);
        odom.step();
        assert_eq!(odom.pose(), Pose::origin());
    }
}
