use std::time::Duration;

use log::{info, warn};

use super::profile::{BrakeProfile, MotionProfile, StallGuard};
use crate::{
    drivetrain::{Differential, DriveCommand, DriveMotor, StopMode},
    motion::odom::{
        devices::{DrivetrainConfig, HeadingSensor, Pose, SharedPose},
        tracker::OdomTracker,
    },
    time::Clock,
};

/// How a primitive ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Reached its target within tolerance.
    Settled,
    /// Gave up because the [`StallGuard`] fired.
    Stalled,
}

/// What a primitive reports when it returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub outcome: Outcome,
    /// Control cycles evaluated, including the terminal one.
    pub cycles:  u32,
    /// Error at the terminal cycle, in the primitive's unit.
    pub error:   f64,
}

impl Motion {
    pub(crate) fn settled(cycles: u32, error: f64) -> Self {
        Self {
            outcome: Outcome::Settled,
            cycles,
            error,
        }
    }

    pub(crate) fn stalled(cycles: u32, error: f64) -> Self {
        Self {
            outcome: Outcome::Stalled,
            cycles,
            error,
        }
    }

    pub fn is_settled(&self) -> bool { self.outcome == Outcome::Settled }
}

/// The Movement Controller.
///
/// Owns a handle on the drivetrain and a read handle on the pose that an
/// [`OdomTracker`] keeps up to date in the background. The primitives
/// ([`turn_to`](Self::turn_to), [`drive_straight`](Self::drive_straight),
/// [`drive_to_point`](Self::drive_to_point)) only read the pose; they never
/// step the estimator themselves.
///
/// # Examples
///
/// ```ignore
/// use odonav::motion::pid::{profile::MotionProfile, Movement};
///
/// let odom = Rc::new(OdomTracker::new(drivetrain, imu, DrivetrainConfig::default()));
/// odom.init();
///
/// let movement = Movement::from_tracker(&odom, MotionProfile::default(), VexClock);
/// movement.turn_to(FRAC_PI_2).await;
/// movement.drive_straight(24.0).await;
/// ```
pub struct Movement<M: 'static, C> {
    /// The differential drivetrain to command.
    pub drivetrain: Differential<M>,
    /// Wheel geometry, used to turn encoder degrees into inches.
    pub config:     DrivetrainConfig,
    /// Gains and thresholds of every primitive.
    pub profile:    MotionProfile,
    /// Time source and loop pacing.
    pub clock:      C,
    pose:           SharedPose,
}

impl<M: DriveMotor + 'static, C: Clock> Movement<M, C> {
    pub fn new(
        drivetrain: Differential<M>,
        pose: SharedPose,
        config: DrivetrainConfig,
        profile: MotionProfile,
        clock: C,
    ) -> Self {
        Self {
            drivetrain,
            config,
            profile,
            clock,
            pose,
        }
    }

    /// Shares the drivetrain, geometry and pose of a running tracker.
    pub fn from_tracker<H: HeadingSensor>(
        odom: &OdomTracker<M, H>,
        profile: MotionProfile,
        clock: C,
    ) -> Self {
        Self::new(
            odom.drivetrain.clone(),
            odom.shared_pose(),
            odom.config,
            profile,
            clock,
        )
    }

    /// The latest pose published by the estimator.
    pub fn pose(&self) -> Pose { self.pose.get() }

    /// Wheel travel of each side in inches, `None` if the encoders cannot be
    /// read.
    pub(crate) fn wheel_travel(&self) -> Option<(f64, f64)> {
        match self.drivetrain.position() {
            Ok((left, right)) => Some((
                self.config.degrees_to_inches(left),
                self.config.degrees_to_inches(right),
            )),
            Err(e) => {
                warn!("Drive Encoder Error: {}", e);
                None
            }
        }
    }

    /// Runs the brake sequence after `last`, then holds.
    pub(crate) async fn finish(&self, last: DriveCommand, brake: BrakeProfile) {
        match brake {
            BrakeProfile::None => {}
            BrakeProfile::Pulse { power, duration } => {
                self.drivetrain.apply(
                    DriveCommand {
                        left:  -direction(last.left) * power,
                        right: -direction(last.right) * power,
                        unit:  last.unit,
                    }
                    .clamped(),
                );
                self.clock.sleep(duration).await;
            }
            BrakeProfile::Decay {
                factor,
                steps,
                step,
            } => {
                let mut command = last;
                for _ in 0..steps {
                    command.left *= factor;
                    command.right *= factor;
                    self.drivetrain.apply(command.clamped());
                    self.clock.sleep(step).await;
                }
            }
        }
        self.drivetrain.stop(StopMode::Hold);
    }

    /// Holds in place and reports a stall.
    pub(crate) fn abort(&self, name: &str, cycles: u32, error: f64) -> Motion {
        self.drivetrain.stop(StopMode::Hold);
        warn!("{}: stalled after {} cycles, error {:.3}", name, cycles, error);
        Motion::stalled(cycles, error)
    }

    pub(crate) fn done(&self, name: &str, cycles: u32, error: f64) -> Motion {
        info!("{}: settled after {} cycles, error {:.3}", name, cycles, error);
        Motion::settled(cycles, error)
    }
}

fn direction(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Tracks whether a primitive is still making progress.
pub(crate) struct StallWatch {
    guard:       StallGuard,
    start:       Duration,
    best:        f64,
    improved_at: Duration,
    cycles:      u32,
}

impl StallWatch {
    pub fn new(guard: StallGuard, now: Duration) -> Self {
        Self {
            guard,
            start: now,
            best: f64::INFINITY,
            improved_at: now,
            cycles: 0,
        }
    }

    /// Counts one control cycle and returns the running total, which
    /// saturates instead of wrapping on an unbounded loop.
    pub fn tick(&mut self) -> u32 {
        self.cycles = self.cycles.saturating_add(1);
        self.cycles
    }

    /// Records `error` (a magnitude) at `now` and says whether to give up.
    pub fn stalled(&mut self, now: Duration, error: f64) -> bool {
        if let Some(timeout) = self.guard.timeout {
            if now.saturating_sub(self.start) >= timeout {
                return true;
            }
        }
        if error < self.best - self.guard.min_progress {
            self.best = error;
            self.improved_at = now;
        }
        now.saturating_sub(self.improved_at) >= self.guard.window
    }
}
