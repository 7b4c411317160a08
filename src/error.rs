//! Device error type shared by every hardware seam.
//!
//! Hardware adapters (see [`hardware`](crate::hardware) and [`sim`](crate::sim))
//! translate their native errors into [`DeviceError`]. The control loops never
//! propagate these out: a failed read is logged and the last known value is
//! used instead, so odometry and the motion primitives keep running.

use thiserror::Error;

/// An error reported by a motor, encoder or inertial sensor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    /// The device on the given port is unplugged or not responding.
    #[error("device on port {port} is disconnected")]
    Disconnected {
        /// Smart port number as printed on the brain.
        port: u8,
    },

    /// The device is busy (for example an IMU mid-calibration).
    #[error("device is busy")]
    Busy,

    /// Any other failure reported by the underlying SDK.
    #[error("{0}")]
    Other(String),
}
