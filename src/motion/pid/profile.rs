//! Tuning constants for the motion primitives.
//!
//! Every primitive reads its gains, power limits and termination thresholds
//! from one of the structs here. They are plain values: build one with
//! [`Default`] (the constants of a 2.75" wheel, 36:48 geared competition
//! drivetrain) and override fields as needed.
//!
//! # Example
//!
//! ```ignore
//! use odonav::motion::pid::profile::{MotionProfile, TurnConfig};
//!
//! let profile = MotionProfile {
//!     turn: TurnConfig::bang_bang(),
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use crate::drivetrain::PowerUnit;

/// How [`turn_to`](super::Movement::turn_to) computes its rotation command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnStrategy {
    /// Proportional-derivative on the heading error.
    Pd {
        /// Power per radian of error.
        kp:        f64,
        /// Power per radian of error change since the previous cycle.
        kd:        f64,
        /// Magnitude limit on the output.
        max_power: f64,
    },
    /// Two fixed power levels.
    BangBang {
        /// Power while `|err|` is outside `slow_zone`.
        fast_power: f64,
        /// Power while `|err|` is inside `slow_zone`.
        slow_power: f64,
        /// Radians.
        slow_zone:  f64,
    },
}

/// What a primitive does with the drivetrain once it reaches its target.
///
/// Every variant ends with [`StopMode::Hold`](crate::drivetrain::StopMode::Hold).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrakeProfile {
    /// Hold immediately.
    None,
    /// Drive each side against its last command at `power` for `duration`.
    Pulse { power: f64, duration: Duration },
    /// Scale the last command by `factor` once per `step`, `steps` times.
    Decay {
        factor: f64,
        steps:  u32,
        step:   Duration,
    },
}

/// Gives up on a primitive that is not getting anywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StallGuard {
    /// Hard limit on the whole primitive; `None` for no limit.
    pub timeout:      Option<Duration>,
    /// How long `|err|` may go without improving by `min_progress`.
    pub window:       Duration,
    /// Improvement that counts as progress, in the primitive's error unit.
    pub min_progress: f64,
}

impl StallGuard {
    /// A guard that never fires.
    pub fn disabled() -> Self {
        Self {
            timeout:      None,
            window:       Duration::MAX,
            min_progress: 0.0,
        }
    }
}

/// Tuning for [`turn_to`](super::Movement::turn_to).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnConfig {
    pub strategy:  TurnStrategy,
    /// Smallest output while outside `stop_zone`.
    pub min_power: f64,
    /// Radians. The turn is done once `|err|` drops below this.
    pub stop_zone: f64,
    /// Radians. Stop this far ahead of the target and let momentum finish.
    pub lead:      f64,
    pub unit:      PowerUnit,
    pub brake:     BrakeProfile,
    pub stall:     StallGuard,
    /// Control loop period.
    pub period:    Duration,
}

impl TurnConfig {
    /// PD turn tuned for a 2.75" wheel, 36:48 drivetrain (`kp = 6`, `kd = 0.8`,
    /// clamped to ±10 V).
    pub fn pd() -> Self {
        Self {
            strategy:  TurnStrategy::Pd {
                kp:        6.0,
                kd:        0.8,
                max_power: 10.0,
            },
            min_power: 2.0,
            stop_zone: 0.02,
            lead:      0.0,
            unit:      PowerUnit::Voltage,
            brake:     BrakeProfile::Pulse {
                power:    2.0,
                duration: Duration::from_millis(20),
            },
            stall:     StallGuard {
                timeout:      Some(Duration::from_secs(10)),
                window:       Duration::from_secs(1),
                min_progress: 0.01,
            },
            period:    Duration::from_millis(10),
        }
    }

    /// Fast/slow bang-bang turn that cuts power slightly early.
    pub fn bang_bang() -> Self {
        Self {
            strategy: TurnStrategy::BangBang {
                fast_power: 6.0,
                slow_power: 2.5,
                slow_zone:  0.5,
            },
            lead: 0.03,
            ..Self::pd()
        }
    }
}

impl Default for TurnConfig {
    fn default() -> Self { Self::pd() }
}

/// Tuning for [`drive_straight`](super::Movement::drive_straight).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightConfig {
    /// Base power while `|err|` is outside `slow_zone`.
    pub fast_power:        f64,
    /// Base power while `|err|` is inside `slow_zone`.
    pub slow_power:        f64,
    /// Inches.
    pub slow_zone:         f64,
    /// Inches. The drive is done once `|err|` drops below this.
    pub stop_zone:         f64,
    /// Smallest base power while outside `stop_zone`.
    pub min_power:         f64,
    /// Magnitude limit on each side after heading correction.
    pub max_power:         f64,
    /// Power per radian of drift from the heading held at the start.
    pub heading_kp:        f64,
    /// Multiplies the requested distance, to trim out systematic over- or
    /// under-travel.
    pub correction_factor: f64,
    /// Largest change of either side's power between cycles; `None` for no
    /// limit.
    pub slew_step:         Option<f64>,
    pub unit:              PowerUnit,
    pub brake:             BrakeProfile,
    pub stall:             StallGuard,
    pub period:            Duration,
}

impl Default for StraightConfig {
    fn default() -> Self {
        Self {
            fast_power:        8.0,
            slow_power:        3.0,
            slow_zone:         6.0,
            stop_zone:         0.5,
            min_power:         2.0,
            max_power:         12.0,
            heading_kp:        8.0,
            correction_factor: 1.0,
            slew_step:         None,
            unit:              PowerUnit::Voltage,
            brake:             BrakeProfile::Pulse {
                power:    3.0,
                duration: Duration::from_millis(30),
            },
            stall:             StallGuard {
                timeout:      Some(Duration::from_secs(10)),
                window:       Duration::from_secs(1),
                min_progress: 0.25,
            },
            period:            Duration::from_millis(10),
        }
    }
}

/// Tuning for [`drive_to_point`](super::Movement::drive_to_point).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointConfig {
    /// Forward power per inch of remaining distance.
    pub kp_distance:       f64,
    /// Turn power per radian of heading error.
    pub kp_turn:           f64,
    pub max_forward:       f64,
    pub max_turn:          f64,
    /// Smallest forward power while outside `tolerance`.
    pub min_forward:       f64,
    /// Smallest turn power while `|heading_err| > heading_tolerance`.
    pub min_turn:          f64,
    /// Radians.
    pub heading_tolerance: f64,
    /// Radians. Beyond this heading error the robot turns in place.
    pub turn_threshold:    f64,
    /// Inches. Arrival radius.
    pub tolerance:         f64,
    pub unit:              PowerUnit,
    pub brake:             BrakeProfile,
    pub stall:             StallGuard,
    pub period:            Duration,
}

impl Default for PointConfig {
    fn default() -> Self {
        Self {
            kp_distance:       1.0,
            kp_turn:           2.5,
            max_forward:       7.0,
            max_turn:          5.0,
            min_forward:       2.0,
            min_turn:          2.0,
            heading_tolerance: 0.05,
            turn_threshold:    0.25,
            tolerance:         0.5,
            unit:              PowerUnit::Voltage,
            brake:             BrakeProfile::None,
            stall:             StallGuard {
                timeout:      Some(Duration::from_secs(10)),
                window:       Duration::from_secs(1),
                min_progress: 0.25,
            },
            period:            Duration::from_millis(15),
        }
    }
}

/// Tuning for every primitive of a [`Movement`](super::Movement).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionProfile {
    pub turn:     TurnConfig,
    pub straight: StraightConfig,
    pub point:    PointConfig,
}
