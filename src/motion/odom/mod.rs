//! Odometry tracking for robot position estimation.
//!
//! This module dead-reckons the robot's field pose from the drive motor
//! encoders and a gyroscopic heading sensor.
//!
//! # Module Structure
//!
//! - **[`devices`]**: The heading sensor seam, drivetrain geometry and pose
//!   types.
//! - **[`tracker`]**: The odometry tracking controller.
//! - **[`ptsht`]**: Point-and-shoot navigation using odometry.
//!
//! # How It Works
//!
//! Every cycle the tracker averages the encoder travel of the left and right
//! drive sides to get the forward displacement, and takes the shortest-path
//! change of the gyro reading as the heading change. The displacement is
//! applied along the midpoint heading of the cycle. Errors accumulate over
//! time; nothing here corrects them.
//!
//! # Hardware Requirements
//!
//! - **Drive motors with integrated encoders** on both sides.
//! - **Inertial sensor (IMU)**: Measures rotation for accurate heading.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//!
//! use odonav::motion::odom::{devices::DrivetrainConfig, tracker::OdomTracker};
//! use vexide::prelude::*;
//!
//! let imu = InertialSensor::new(peripherals.port_10);
//! let odom = Rc::new(OdomTracker::new(drivetrain.clone(), imu, DrivetrainConfig::default()));
//! odom.reset_pose(&VexClock).await;
//! odom.init();
//! ```

pub(crate) mod algorithm;

/// Sensor seam and position types.
pub mod devices;

/// Point-and-shoot navigation.
pub mod ptsht;

/// Main odometry tracking controller.
pub mod tracker;
