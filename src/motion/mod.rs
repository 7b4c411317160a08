//! Autonomous motion control.
//!
//! This module provides tools for precise robot movement during autonomous
//! periods. It includes:
//!
//! - **Odometry**: Position tracking using the drive encoders and an inertial
//!   sensor.
//! - **Motion primitives**: Turn-to-heading, drive-straight and
//!   drive-to-point control loops.
//! - **Point-and-shoot**: Turn-then-drive navigation to field points.
//!
//! # Architecture
//!
//! The odometry tracker runs as a background task that publishes the pose.
//! Movement methods are `async` and run their control loop inline, reading
//! that pose each cycle, and return once the target is reached.
//!
//! # Example
//!
//! ```ignore
//! use odonav::motion::pid::{profile::MotionProfile, Movement};
//!
//! let movement = Movement::from_tracker(&odom, MotionProfile::default(), VexClock);
//!
//! movement.drive_straight(24.0).await; // Move 24 inches
//! movement.turn_to(FRAC_PI_2).await; // Face +y
//! ```

/// Angle and power helpers.
pub mod math;

/// Odometry tracking for position estimation.
///
/// Provides the [`OdomTracker`](odom::tracker::OdomTracker) struct for
/// tracking the robot's global position.
pub mod odom;

/// Closed-loop motion primitives.
pub mod pid;
