//! Closed-loop motion primitives for a differential drivetrain.
//!
//! Every primitive is an `async fn` on [`Movement`] that runs its own control
//! loop: read the latest pose (and, for straight drives, the drive encoders),
//! compute an error, issue one clamped [`DriveCommand`](crate::drivetrain::DriveCommand)
//! and sleep for one period. The loop ends in one of two ways:
//!
//! - **Settled**: the error is inside the stop zone. The configured
//!   [`BrakeProfile`](profile::BrakeProfile) runs and the drivetrain holds.
//! - **Stalled**: the [`StallGuard`](profile::StallGuard) fired. The
//!   drivetrain holds at once.
//!
//! # Available Primitives
//!
//! - [`turn_to`](Movement::turn_to): rotate in place to an absolute heading,
//!   with a PD or bang-bang strategy.
//! - [`drive_straight`](Movement::drive_straight): drive a distance while
//!   holding the entry heading.
//! - [`drive_to_point`](Movement::drive_to_point): continuously steer to a
//!   field point.
//!
//! # Tuning
//!
//! Gains and thresholds live in [`MotionProfile`](profile::MotionProfile).
//! Raise the minimum power until the robot reliably starts moving from rest,
//! then raise `kp` until it reaches the target briskly. Add `kd` (turns) or a
//! brake pulse if it overshoots.

mod movement;
mod point;
mod straight;
mod turn;

/// Tuning constants for the primitives.
pub mod profile;

pub use movement::{Motion, Movement, Outcome};
