//! Differential drivetrain actuation.
//!
//! This module is the actuator seam of the crate. A [`DriveMotor`] is a single
//! motor with an integrated encoder; a [`Differential`] groups the motors of the
//! left and right sides and exposes "set left/right power", "stop" and
//! "read/reset encoders" for the whole drivetrain.
//!
//! Every command is clamped to the valid range of its [`PowerUnit`] before it
//! reaches a motor, and percent commands are converted to volts.
//!
//! # Example
//!
//! ```ignore
//! use odonav::drivetrain::{Differential, PowerUnit, StopMode};
//!
//! let drivetrain = Differential::new([left_front, left_back], [right_front, right_back]);
//!
//! drivetrain.set_power(6.0, 6.0, PowerUnit::Voltage);
//! drivetrain.stop(StopMode::Hold);
//! ```

use std::{cell::RefCell, rc::Rc};

use log::warn;

use crate::error::DeviceError;

/// Maximum voltage a V5 smart motor accepts.
pub const MAX_VOLTAGE: f64 = 12.0;

/// A single drive motor with an integrated encoder.
pub trait DriveMotor {
    /// Spins the motor at the given voltage (`-12.0..=12.0`).
    fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError>;

    /// Stops the motor using the given stop behavior.
    fn brake(&mut self, mode: StopMode) -> Result<(), DeviceError>;

    /// Encoder position of the motor shaft in degrees.
    fn position(&self) -> Result<f64, DeviceError>;

    /// Sets the encoder position to zero.
    fn reset_position(&mut self) -> Result<(), DeviceError>;
}

/// How the drivetrain behaves once power is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Motors spin freely.
    Coast,
    /// Motors short their windings and resist rotation.
    Brake,
    /// Motors actively hold their current position.
    Hold,
}

/// The unit a drive power is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUnit {
    /// Volts, valid range `-12.0..=12.0`.
    Voltage,
    /// Percent of full power, valid range `-100.0..=100.0`.
    Percent,
}

impl PowerUnit {
    /// The largest magnitude that is valid in this unit.
    pub fn max(self) -> f64 {
        match self {
            PowerUnit::Voltage => MAX_VOLTAGE,
            PowerUnit::Percent => 100.0,
        }
    }

    /// Clamps `value` to the valid range of this unit.
    pub fn clamp(self, value: f64) -> f64 { value.clamp(-self.max(), self.max()) }

    /// Clamps `value` and converts it to motor volts.
    pub fn to_volts(self, value: f64) -> f64 {
        let value = self.clamp(value);
        match self {
            PowerUnit::Voltage => value,
            PowerUnit::Percent => value / 100.0 * MAX_VOLTAGE,
        }
    }
}

/// A left/right power pair in a declared unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    /// Power for the left side.
    pub left:  f64,
    /// Power for the right side.
    pub right: f64,
    /// Unit of `left` and `right`.
    pub unit:  PowerUnit,
}

impl DriveCommand {
    /// A command in volts.
    pub fn volts(left: f64, right: f64) -> Self {
        Self {
            left,
            right,
            unit: PowerUnit::Voltage,
        }
    }

    /// A command in percent of full power.
    pub fn percent(left: f64, right: f64) -> Self {
        Self {
            left,
            right,
            unit: PowerUnit::Percent,
        }
    }

    /// The same command with both sides clamped to the unit's range.
    pub fn clamped(self) -> Self {
        Self {
            left:  self.unit.clamp(self.left),
            right: self.unit.clamp(self.right),
            unit:  self.unit,
        }
    }
}

/// A differential drivetrain.
///
/// The motors are stored in reference-counted cells so the same drivetrain can
/// be shared between the odometry tracker (which reads the encoders) and the
/// motion primitives (which command power). Cloning is cheap and every clone
/// refers to the same motors.
///
/// When a side has more than one motor, encoder readings are averaged over the
/// motors on that side.
pub struct Differential<M: 'static> {
    /// The left motor group.
    pub left:  Rc<RefCell<dyn AsMut<[M]>>>,
    /// The right motor group.
    pub right: Rc<RefCell<dyn AsMut<[M]>>>,
}

impl<M: 'static> Clone for Differential<M> {
    fn clone(&self) -> Self {
        Self {
            left:  self.left.clone(),
            right: self.right.clone(),
        }
    }
}

impl<M: DriveMotor + 'static> Differential<M> {
    /// Creates a new drivetrain with the provided left/right motors.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let drivetrain = Differential::new([left_front, left_back], [right_front, right_back]);
    /// ```
    pub fn new<L: AsMut<[M]> + 'static, R: AsMut<[M]> + 'static>(left: L, right: R) -> Self {
        Self {
            left:  Rc::new(RefCell::new(left)),
            right: Rc::new(RefCell::new(right)),
        }
    }

    /// Creates a drivetrain from motor groups that are already shared.
    pub fn from_shared<L: AsMut<[M]> + 'static, R: AsMut<[M]> + 'static>(
        left: Rc<RefCell<L>>,
        right: Rc<RefCell<R>>,
    ) -> Self {
        Self { left, right }
    }

    /// Sets left/right drive power in the given unit.
    ///
    /// Values outside the unit's range are clamped.
    pub fn set_power(&self, left: f64, right: f64, unit: PowerUnit) {
        self.apply(DriveCommand { left, right, unit });
    }

    /// Issues a [`DriveCommand`] to both sides.
    pub fn apply(&self, command: DriveCommand) {
        let left_voltage = command.unit.to_volts(command.left);
        let right_voltage = command.unit.to_volts(command.right);
        for_each_motor(&self.left, |motor| motor.set_voltage(left_voltage));
        for_each_motor(&self.right, |motor| motor.set_voltage(right_voltage));
    }

    /// Sets left/right drive power in percent.
    pub fn drive_percent(&self, left: f64, right: f64) {
        self.set_power(left, right, PowerUnit::Percent);
    }

    /// Stops every motor with the given stop behavior.
    pub fn stop(&self, mode: StopMode) {
        for_each_motor(&self.left, |motor| motor.brake(mode));
        for_each_motor(&self.right, |motor| motor.brake(mode));
    }

    /// Stops the drivetrain with [`StopMode::Brake`].
    pub fn stop_drive(&self) { self.stop(StopMode::Brake); }

    /// Zeroes the encoder of every motor.
    ///
    /// # Errors
    ///
    /// Every motor is reset even if one fails; the first error is returned.
    pub fn reset_position(&self) -> Result<(), DeviceError> {
        let mut result = Ok(());
        for side in [&self.left, &self.right] {
            let mut motors = side.borrow_mut();
            for motor in motors.as_mut() {
                if let Err(e) = motor.reset_position() {
                    warn!("Motor Encoder Reset Error: {}", e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    /// Returns the average encoder position of each side, in degrees.
    ///
    /// Motors whose position cannot be read are left out of their side's
    /// average and a warning is logged.
    ///
    /// # Errors
    ///
    /// Fails only when no motor on a side could be read.
    pub fn position(&self) -> Result<(f64, f64), DeviceError> {
        Ok((side_position(&self.left)?, side_position(&self.right)?))
    }
}

fn for_each_motor<M>(
    side: &Rc<RefCell<dyn AsMut<[M]>>>,
    mut f: impl FnMut(&mut M) -> Result<(), DeviceError>,
) {
    let mut motors = side.borrow_mut();
    for motor in motors.as_mut() {
        if let Err(e) = f(motor) {
            warn!("Motor Command Error: {}", e);
        }
    }
}

fn side_position<M: DriveMotor>(side: &Rc<RefCell<dyn AsMut<[M]>>>) -> Result<f64, DeviceError> {
    let mut motors = side.borrow_mut();
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut last_error = None;
    for motor in motors.as_mut().iter() {
        match motor.position() {
            Ok(p) => {
                sum += p;
                count += 1;
            }
            Err(e) => {
                warn!("Error Getting Motor Encoder Position: {}", e);
                last_error = Some(e);
            }
        }
    }
    match (count, last_error) {
        (0, Some(e)) => Err(e),
        (0, None) => Ok(0.0),
        _ => Ok(sum / count as f64),
    }
}
