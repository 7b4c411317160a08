//! Tracking devices and position types for odometry.
//!
//! This module provides the sensor seam and the data types used by the
//! odometry tracker:
//!
//! - **HeadingSensor**: a gyroscopic heading source (the V5 inertial sensor on
//!   the robot, a simulated one in tests).
//! - **DrivetrainConfig**: wheel size and gearing used to turn encoder degrees
//!   into inches.
//! - **Pose** / **SharedPose**: the robot's field position and the single
//!   shared record the tracker writes.
//!
//! # Heading convention
//!
//! Headings are in radians, `0` facing the +x axis and counter-clockwise
//! positive. A forward displacement `ds` moves the robot by
//! `(ds·cos θ, ds·sin θ)`. Sensors that count clockwise (the V5 IMU does) must
//! be negated by their adapter.

use std::{
    f64::consts::PI,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{error::DeviceError, motion::math};

/// A gyroscopic heading source.
pub trait HeadingSensor {
    /// Raw heading in radians, counter-clockwise positive.
    ///
    /// The reading may be bounded (wrapping at some boundary) or continuous;
    /// the tracker only ever looks at the shortest-path change between two
    /// readings.
    fn heading(&self) -> Result<f64, DeviceError>;

    /// Re-zeroes the sensor's heading reference.
    fn reset_heading(&mut self) -> Result<(), DeviceError>;

    /// Whether the sensor is still calibrating or settling.
    fn is_calibrating(&self) -> Result<bool, DeviceError>;
}

/// How the tracker reports [`Pose::theta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingMode {
    /// Wrapped to `(-π, π]` after every update.
    #[default]
    Wrapped,
    /// The continuously accumulated heading. Two full turns read as `4π`.
    Unwrapped,
}

impl HeadingMode {
    /// Applies this mode to an accumulated heading.
    pub fn apply(self, accumulated: f64) -> f64 {
        match self {
            HeadingMode::Wrapped => math::angle_wrap(accumulated),
            HeadingMode::Unwrapped => accumulated,
        }
    }
}

/// Physical configuration of the drivetrain.
///
/// # Example
///
/// ```ignore
/// // 2.75" wheels, 36-tooth gear on the motor driving a 48-tooth gear on the wheel.
/// let config = DrivetrainConfig::new(2.75, 36.0, 48.0, 12.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivetrainConfig {
    /// Wheel diameter in inches.
    pub wheel_diameter: f64,
    /// Teeth on the motor-side gear.
    pub driving_gear:   f64,
    /// Teeth on the wheel-side gear.
    pub driven_gear:    f64,
    /// Distance between the left and right wheels in inches.
    pub track_width:    f64,
}

impl DrivetrainConfig {
    pub fn new(wheel_diameter: f64, driving_gear: f64, driven_gear: f64, track_width: f64) -> Self {
        Self {
            wheel_diameter,
            driving_gear,
            driven_gear,
            track_width,
        }
    }

    /// Wheel revolutions per motor revolution.
    pub fn gear_ratio(&self) -> f64 { self.driving_gear / self.driven_gear }

    /// Wheel circumference in inches.
    pub fn circumference(&self) -> f64 { PI * self.wheel_diameter }

    /// Converts motor encoder degrees to inches travelled by the wheel.
    pub fn degrees_to_inches(&self, degrees: f64) -> f64 {
        (degrees / 360.0) * self.gear_ratio() * self.circumference()
    }

    /// Converts inches travelled by the wheel to motor encoder degrees.
    pub fn inches_to_degrees(&self, inches: f64) -> f64 {
        inches / (self.gear_ratio() * self.circumference()) * 360.0
    }
}

impl Default for DrivetrainConfig {
    /// 2.75" wheels geared 36:48 from the motor, 12.5" track.
    fn default() -> Self { Self::new(2.75, 36.0, 48.0, 12.5) }
}

/// A 2D position with heading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// The x-coordinate in inches.
    pub x:     f64,
    /// The y-coordinate in inches.
    pub y:     f64,
    /// The heading in radians; see [`HeadingMode`].
    pub theta: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Self { Self { x, y, theta } }

    /// The origin, facing +x.
    pub fn origin() -> Self { Self::default() }

    /// Straight-line distance to a field point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 { (x - self.x).hypot(y - self.y) }

    /// Field bearing from this pose to a point, `None` if the point is here.
    pub fn bearing_to(&self, x: f64, y: f64) -> Option<f64> {
        math::bearing(x - self.x, y - self.y)
    }
}

/// The shared pose record.
///
/// The odometry tracker is its only writer; anything else (the motion
/// primitives, telemetry, a driver-control overlay) holds a clone and reads
/// snapshots with [`get`](Self::get), which never triggers an estimator step.
#[derive(Debug, Clone, Default)]
pub struct SharedPose(Arc<Mutex<Pose>>);

impl SharedPose {
    pub fn new(pose: Pose) -> Self { Self(Arc::new(Mutex::new(pose))) }

    /// A snapshot of the current pose.
    pub fn get(&self) -> Pose { *self.0.lock().unwrap_or_else(PoisonError::into_inner) }

    pub(crate) fn set(&self, pose: Pose) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = pose;
    }
}
