use log::{debug, info};

use super::{
    movement::{Motion, Movement, StallWatch},
    profile::TurnStrategy,
};
use crate::{
    drivetrain::{DriveCommand, DriveMotor},
    motion::math::{abscap, angle_wrap, min_power},
    time::Clock,
};

impl<M: DriveMotor + 'static, C: Clock> Movement<M, C> {
    /// Rotates in place to an absolute field heading in radians.
    ///
    /// The error is always taken the short way round, so the robot never turns
    /// more than half a revolution. The turn ends when the error drops below
    /// the stop zone, when it is within the configured lead, or when the
    /// target has been crossed; the brake sequence then runs and the
    /// drivetrain holds.
    ///
    /// A robot already within the stop zone returns at once without moving.
    pub async fn turn_to(&self, target: f64) -> Motion {
        let cfg = self.profile.turn;
        let mut watch = StallWatch::new(cfg.stall, self.clock.now());
        let mut first_sign = None;
        let mut prev_err = None;
        let mut last = DriveCommand {
            left:  0.0,
            right: 0.0,
            unit:  cfg.unit,
        };

        info!("turn_to: target {:.3} rad", target);
        loop {
            let cycles = watch.tick();
            let err = angle_wrap(target - self.pose().theta);

            if err.abs() < cfg.stop_zone && cycles == 1 {
                return self.done("turn_to", cycles, err);
            }
            let sign = *first_sign.get_or_insert(err.signum());
            let crossed = err != 0.0 && err.signum() != sign;
            if err.abs() < cfg.stop_zone || err.abs() <= cfg.lead || crossed {
                self.finish(last, cfg.brake).await;
                return self.done("turn_to", cycles, err);
            }
            if watch.stalled(self.clock.now(), err.abs()) {
                return self.abort("turn_to", cycles, err);
            }

            let (out, cap) = match cfg.strategy {
                TurnStrategy::Pd { kp, kd, max_power } => {
                    let derivative = err - prev_err.unwrap_or(err);
                    (kp * err + kd * derivative, max_power)
                }
                TurnStrategy::BangBang {
                    fast_power,
                    slow_power,
                    slow_zone,
                } => {
                    let power = if err.abs() > slow_zone { fast_power } else { slow_power };
                    (err.signum() * power, fast_power.max(slow_power))
                }
            };
            prev_err = Some(err);
            let out = abscap(min_power(abscap(out, cap), err, cfg.min_power, cfg.stop_zone), cap);
            debug!("turn_to: err {:.4} out {:.3}", err, out);

            last = DriveCommand {
                left:  -out,
                right: out,
                unit:  cfg.unit,
            };
            self.drivetrain.apply(last);
            self.clock.sleep(cfg.period).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        f64::consts::{FRAC_PI_2, PI, TAU},
        time::Duration,
    };

    use super::*;
    use crate::{
        drivetrain::StopMode,
        motion::{
            odom::devices::{HeadingMode, Pose},
            pid::{
                movement::Outcome,
                profile::{MotionProfile, TurnConfig},
            },
        },
        sim::{Side, SimClock, SimEvent, SimMotor, SimRobot},
    };

    fn setup(profile: MotionProfile) -> (SimRobot, Movement<SimMotor, SimClock>) {
        setup_at(Pose::origin(), profile)
    }

    fn setup_at(pose: Pose, profile: MotionProfile) -> (SimRobot, Movement<SimMotor, SimClock>) {
        let robot = SimRobot::default();
        robot.set_pose(pose);
        let clock = SimClock::new(&robot);
        let tracker = robot.tracker();
        tracker.reset_pose_to(pose);
        let odom = clock.spawn_odometry(tracker);
        let movement = Movement::from_tracker(&odom, profile, clock);
        (robot, movement)
    }

    fn left_volts(events: &[SimEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match *e {
                SimEvent::Voltage {
                    side: Side::Left,
                    volts,
                    ..
                } => Some(volts),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn quarter_turn_brakes_then_holds() {
        let (robot, movement) = setup(MotionProfile::default());
        let report = pollster::block_on(movement.turn_to(FRAC_PI_2));
        assert_eq!(report.outcome, Outcome::Settled);

        pollster::block_on(movement.clock.sleep(Duration::from_millis(50)));
        let err = angle_wrap(FRAC_PI_2 - movement.pose().theta);
        assert!(err.abs() < 0.03, "final error {err}");

        let events = robot.events();
        let volts = left_volts(&events);
        assert!(volts.len() > 2);
        // Counter-clockwise: left runs backwards until the brake pulse.
        assert!(volts[..volts.len() - 1].iter().all(|&v| v < 0.0));
        assert!(*volts.last().unwrap() > 0.0);
        assert!(matches!(
            events.last(),
            Some(SimEvent::Stop {
                mode: StopMode::Hold,
                ..
            })
        ));
    }

    #[test]
    fn output_stays_within_power_bound() {
        let (robot, movement) = setup(MotionProfile::default());
        pollster::block_on(movement.turn_to(-2.5));
        assert!(left_volts(&robot.events()).iter().all(|v| v.abs() <= 10.0));
    }

    #[test]
    fn turns_the_short_way_across_the_wrap() {
        let start = Pose::new(0.0, 0.0, 3.0);
        let (robot, movement) = setup_at(start, MotionProfile::default());
        pollster::block_on(movement.turn_to(-3.0));
        // 3.0 to -3.0 is a short counter-clockwise turn through π.
        let theta = robot.true_pose().theta;
        assert!(theta > PI, "theta {theta}");
        assert!(theta < 2.0 * PI - 3.0 + 0.05, "theta {theta}");
    }

    #[test]
    fn unwrapped_heading_turns_the_short_way() {
        let start = Pose::new(0.0, 0.0, TAU + 0.2);
        let robot = SimRobot::default();
        robot.set_pose(start);
        let clock = SimClock::new(&robot);
        let tracker = robot.tracker().with_heading_mode(HeadingMode::Unwrapped);
        tracker.reset_pose_to(start);
        let odom = clock.spawn_odometry(tracker);
        let movement = Movement::from_tracker(&odom, MotionProfile::default(), clock);

        // A field heading of π/2 is 1.37 rad counter-clockwise from here.
        let report = pollster::block_on(movement.turn_to(FRAC_PI_2));
        assert_eq!(report.outcome, Outcome::Settled);
        pollster::block_on(movement.clock.sleep(Duration::from_millis(50)));
        let theta = movement.pose().theta;
        assert!((theta - (TAU + FRAC_PI_2)).abs() < 0.03, "theta {theta}");
        assert!((robot.true_pose().theta - theta).abs() < 1e-6);
    }

    #[test]
    fn already_on_target_does_nothing() {
        let (robot, movement) = setup(MotionProfile::default());
        let report = pollster::block_on(movement.turn_to(0.01));
        assert_eq!(report.outcome, Outcome::Settled);
        assert_eq!(report.cycles, 1);
        assert!(robot.events().is_empty());
    }

    #[test]
    fn bang_bang_stops_at_lead() {
        let profile = MotionProfile {
            turn: TurnConfig::bang_bang(),
            ..Default::default()
        };
        let (robot, movement) = setup(profile);
        let report = pollster::block_on(movement.turn_to(1.0));
        assert_eq!(report.outcome, Outcome::Settled);
        assert!(report.error.abs() <= 0.03 || report.error < 0.0);
        assert!(left_volts(&robot.events()).iter().all(|v| v.abs() <= 6.0));
        pollster::block_on(movement.clock.sleep(Duration::from_millis(50)));
        assert!((movement.pose().theta - 1.0).abs() < 0.06);
    }

    #[test]
    fn blocked_robot_stalls() {
        let (robot, movement) = setup(MotionProfile::default());
        robot.set_blocked(true);
        let report = pollster::block_on(movement.turn_to(FRAC_PI_2));
        assert_eq!(report.outcome, Outcome::Stalled);
        assert!(movement.clock.now() < Duration::from_secs(2));
        assert!(matches!(
            robot.events().last(),
            Some(SimEvent::Stop {
                mode: StopMode::Hold,
                ..
            })
        ));
    }
}
