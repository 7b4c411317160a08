//! V5 hardware bindings through vexide.
//!
//! Implements the crate's device seams for the vexide types:
//!
//! - [`DriveMotor`] for [`Motor`].
//! - [`HeadingSensor`] for [`InertialSensor`]. The V5 IMU counts clockwise in
//!   degrees; its rotation is negated and converted to radians here so the
//!   estimator sees counter-clockwise-positive radians.
//! - [`Clock`] as [`VexClock`], backed by the brain's uptime and the vexide
//!   executor's sleep.
//!
//! # Example
//!
//! ```ignore
//! use odonav::{drivetrain::Differential, hardware::VexClock};
//! use vexide::prelude::*;
//!
//! #[vexide::main]
//! async fn main(peripherals: Peripherals) {
//!     let drivetrain = Differential::new(
//!         [
//!             Motor::new(peripherals.port_1, Gearset::Green, Direction::Reverse),
//!             Motor::new(peripherals.port_2, Gearset::Green, Direction::Reverse),
//!         ],
//!         [
//!             Motor::new(peripherals.port_3, Gearset::Green, Direction::Forward),
//!             Motor::new(peripherals.port_4, Gearset::Green, Direction::Forward),
//!         ],
//!     );
//!     let imu = InertialSensor::new(peripherals.port_10);
//!     let odom = Rc::new(OdomTracker::new(drivetrain, imu, DrivetrainConfig::default()));
//!     odom.reset_pose(&VexClock::new()).await;
//!     odom.init();
//! }
//! ```

use std::{future::Future, rc::Rc, time::Duration};

use vexide::{prelude::*, time::Instant};

use crate::{
    drivetrain::{DriveMotor, StopMode},
    error::DeviceError,
    motion::odom::{
        devices::HeadingSensor,
        tracker::{OdomTracker, ODOM_PERIOD},
    },
    time::Clock,
};

fn device_error(e: impl core::fmt::Display) -> DeviceError { DeviceError::Other(e.to_string()) }

impl DriveMotor for Motor {
    fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        Motor::set_voltage(self, volts).map_err(device_error)
    }

    fn brake(&mut self, mode: StopMode) -> Result<(), DeviceError> {
        let mode = match mode {
            StopMode::Coast => BrakeMode::Coast,
            StopMode::Brake => BrakeMode::Brake,
            StopMode::Hold => BrakeMode::Hold,
        };
        Motor::brake(self, mode).map_err(device_error)
    }

    fn position(&self) -> Result<f64, DeviceError> {
        Motor::position(self)
            .map(|position| position.as_degrees())
            .map_err(device_error)
    }

    fn reset_position(&mut self) -> Result<(), DeviceError> {
        Motor::reset_position(self).map_err(device_error)
    }
}

impl HeadingSensor for InertialSensor {
    fn heading(&self) -> Result<f64, DeviceError> {
        InertialSensor::rotation(self)
            .map(|degrees| (-degrees).to_radians())
            .map_err(device_error)
    }

    fn reset_heading(&mut self) -> Result<(), DeviceError> {
        InertialSensor::reset_rotation(self).map_err(device_error)
    }

    fn is_calibrating(&self) -> Result<bool, DeviceError> {
        InertialSensor::is_calibrating(self).map_err(device_error)
    }
}

/// Brain uptime and the vexide executor's sleep.
#[derive(Debug, Clone, Copy)]
pub struct VexClock {
    start: Instant,
}

impl VexClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for VexClock {
    fn default() -> Self { Self::new() }
}

impl Clock for VexClock {
    fn now(&self) -> Duration { self.start.elapsed() }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> { sleep(duration) }
}

/// Spawns the odometry loop as a detached task on the vexide executor.
pub(crate) fn spawn_odometry<M, H>(tracker: Rc<OdomTracker<M, H>>)
where
    M: DriveMotor + 'static,
    H: HeadingSensor + 'static,
{
    spawn(async move {
        tracker.run(&VexClock::new(), ODOM_PERIOD).await;
    })
    .detach();
}
