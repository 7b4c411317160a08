//! # Odonav
//!
//! Odonav dead-reckons the pose of a differential-drive robot and drives it
//! around the field with closed-loop motion primitives. It is built for VEX V5
//! robots through [Vexide](https://vexide.dev) but every device sits behind a
//! trait, so the same code runs against a simulated drivetrain on a desktop.
//!
//! - **Odometry**: Position tracking from the drive encoders and an inertial
//!   sensor, running as a background task.
//! - **Motion Control**: Turn-to-heading, drive-straight and drive-to-point
//!   loops with minimum-power floors, brake pulses and stall detection.
//! - **Navigation**: Point-and-shoot moves to field points and poses.
//! - **Logging**: A console and file logger for debugging and telemetry.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::rc::Rc;
//!
//! use odonav::{
//!     hardware::VexClock,
//!     motion::{
//!         odom::{devices::DrivetrainConfig, ptsht::PointShoot, tracker::OdomTracker},
//!         pid::{profile::MotionProfile, Movement},
//!     },
//! };
//!
//! let clock = VexClock::new();
//! let odom = Rc::new(OdomTracker::new(drivetrain, imu, DrivetrainConfig::default()));
//! odom.reset_pose(&clock).await;
//! odom.init();
//!
//! let nav = PointShoot::new(Movement::from_tracker(&odom, MotionProfile::default(), clock));
//! nav.go_to_point(24.0, 24.0).await;
//! ```
//!
//! ## Modules
//!
//! - [`drivetrain`]: Differential drivetrain actuation.
//! - [`motion`]: Odometry, motion primitives and point-and-shoot navigation.
//! - [`time`]: The clock every control loop sleeps on.
//! - [`fs`]: Filesystem utilities including logging.
//! - [`error`]: The device error type.

/// Differential drivetrain actuation.
///
/// Provides the [`Differential`](drivetrain::Differential) struct for
/// commanding robots with left and right motor groups, and the
/// [`DriveMotor`](drivetrain::DriveMotor) seam it is built on.
pub mod drivetrain;

/// Device errors.
pub mod error;

/// Filesystem utilities module.
///
/// Contains logging functionality for recording robot telemetry and debug
/// information to the console and a file.
pub mod fs;

/// Autonomous motion control module.
///
/// - **Odometry**: Position tracking using the drive encoders and an inertial
///   sensor.
/// - **Primitives**: Closed-loop turns, straight drives and point drives.
pub mod motion;

/// Loop timing.
pub mod time;

/// V5 hardware bindings.
#[cfg(feature = "vexide")]
pub mod hardware;

/// Simulated drivetrain, IMU and clock.
#[cfg(any(test, feature = "sim"))]
pub mod sim;
