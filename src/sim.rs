//! A noiseless differential-drive plant for dry runs and tests.
//!
//! [`SimRobot`] integrates a first-order motor model (voltage sets a target
//! wheel speed, the wheel approaches it with a time constant, and voltages
//! below a static-friction threshold produce no motion) and exposes it through
//! the same seams the real robot uses: [`SimMotor`] implements
//! [`DriveMotor`], [`SimImu`] implements [`HeadingSensor`] and [`SimClock`]
//! implements [`Clock`].
//!
//! Simulated time only moves when something sleeps on the [`SimClock`] (or
//! calls [`SimRobot::advance`]). Background work such as the odometry loop is
//! registered on the clock with [`SimClock::every`] and runs on schedule while
//! the foreground task sleeps, which reproduces the cooperative scheduling of
//! the brain deterministically.
//!
//! # Example
//!
//! ```ignore
//! use odonav::sim::{SimClock, SimRobot};
//!
//! let robot = SimRobot::default();
//! let clock = SimClock::new(&robot);
//! let odom = clock.spawn_odometry(robot.tracker());
//!
//! let movement = Movement::from_tracker(&odom, MotionProfile::default(), clock);
//! pollster::block_on(movement.turn_to(std::f64::consts::FRAC_PI_2));
//! ```

use std::{
    cell::RefCell,
    f64::consts::TAU,
    future::{self, Future},
    rc::Rc,
    time::Duration,
};

use crate::{
    drivetrain::{Differential, DriveMotor, StopMode, MAX_VOLTAGE},
    error::DeviceError,
    motion::odom::{
        devices::{DrivetrainConfig, HeadingSensor, Pose},
        tracker::{OdomTracker, ODOM_PERIOD},
    },
    time::Clock,
};

/// Physics integration step.
const SUBSTEP: Duration = Duration::from_millis(1);

/// Smart port the simulated IMU reports on.
const IMU_PORT: u8 = 10;

/// Motor model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    /// Free speed of the motor shaft at 12 V, in rpm.
    pub motor_rpm:      f64,
    /// Time constant of the wheel speed response while powered, in seconds.
    pub tau:            f64,
    /// Time constant while stopped with [`StopMode::Brake`].
    pub brake_tau:      f64,
    /// Time constant while stopped with [`StopMode::Coast`].
    pub coast_tau:      f64,
    /// Voltage needed to overcome static friction.
    pub static_voltage: f64,
    /// Number of motors on each side.
    pub motors_per_side: usize,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            motor_rpm:       200.0,
            tau:             0.02,
            brake_tau:       0.01,
            coast_tau:       0.2,
            static_voltage:  1.0,
            motors_per_side: 2,
        }
    }
}

/// How the simulated IMU reports its heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImuMode {
    /// Wraps at `[0, 2π)`, like a compass heading.
    #[default]
    Bounded,
    /// Accumulates without bound, like a rotation counter.
    Continuous,
}

/// Which side of the drivetrain a motor or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A command received by the first motor of a side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// A voltage command.
    Voltage {
        time:  Duration,
        side:  Side,
        volts: f64,
    },
    /// A stop command.
    Stop {
        time: Duration,
        side: Side,
        mode: StopMode,
    },
}

/// The plant state after one integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSample {
    pub time:        Duration,
    /// Mean distance travelled by both wheels since the start, in inches.
    pub travel:      f64,
    /// True pose; `theta` is continuous.
    pub pose:        Pose,
    pub left_volts:  f64,
    pub right_volts: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct WheelState {
    volts:        f64,
    stopped:      Option<StopMode>,
    velocity:     f64,
    travel:       f64,
    encoder_zero: f64,
}

#[derive(Debug)]
struct SimState {
    config:          DrivetrainConfig,
    params:          SimParams,
    time:            Duration,
    pose:            Pose,
    left:            WheelState,
    right:           WheelState,
    imu_mode:        ImuMode,
    imu_zero:        f64,
    calibrating_for: Duration,
    blocked:         bool,
    disconnected:    bool,
    events:          Vec<SimEvent>,
    trace:           Vec<TraceSample>,
}

impl SimState {
    fn connected(&self, port: u8) -> Result<(), DeviceError> {
        if self.disconnected {
            Err(DeviceError::Disconnected { port })
        } else {
            Ok(())
        }
    }

    fn wheel(&mut self, side: Side) -> &mut WheelState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn max_speed(&self) -> f64 {
        self.params.motor_rpm / 60.0 * self.config.gear_ratio() * self.config.circumference()
    }

    fn step(&mut self, dt: Duration) {
        let h = dt.as_secs_f64();
        let max_speed = self.max_speed();
        let params = self.params;
        let blocked = self.blocked;
        let mut distances = [0.0; 2];
        for (i, wheel) in [&mut self.left, &mut self.right].into_iter().enumerate() {
            let (target, tau) = match wheel.stopped {
                Some(StopMode::Hold) => (0.0, 0.0),
                Some(StopMode::Brake) => (0.0, params.brake_tau),
                Some(StopMode::Coast) => (0.0, params.coast_tau),
                None => {
                    let effective = (wheel.volts.abs() - params.static_voltage).max(0.0);
                    let span = MAX_VOLTAGE - params.static_voltage;
                    (wheel.volts.signum() * effective / span * max_speed, params.tau)
                }
            };
            let start = wheel.velocity;
            wheel.velocity = if blocked || tau <= 0.0 {
                0.0
            } else {
                target + (start - target) * (-h / tau).exp()
            };
            let moved = (start + wheel.velocity) / 2.0 * h;
            wheel.travel += moved;
            distances[i] = moved;
        }

        let ds = (distances[0] + distances[1]) / 2.0;
        let dtheta = (distances[1] - distances[0]) / self.config.track_width;
        let mid = self.pose.theta + dtheta / 2.0;
        self.pose.x += ds * mid.cos();
        self.pose.y += ds * mid.sin();
        self.pose.theta += dtheta;

        self.time += dt;
        self.calibrating_for = self.calibrating_for.saturating_sub(dt);
        self.trace.push(TraceSample {
            time:        self.time,
            travel:      (self.left.travel + self.right.travel) / 2.0,
            pose:        self.pose,
            left_volts:  self.left.volts,
            right_volts: self.right.volts,
        });
    }

    fn advance(&mut self, duration: Duration) {
        let mut remaining = duration;
        while remaining > Duration::ZERO {
            let dt = remaining.min(SUBSTEP);
            self.step(dt);
            remaining -= dt;
        }
    }
}

/// A simulated robot. Clones share the same plant.
#[derive(Debug, Clone)]
pub struct SimRobot {
    state: Rc<RefCell<SimState>>,
}

impl Default for SimRobot {
    fn default() -> Self { Self::new(DrivetrainConfig::default(), SimParams::default()) }
}

impl SimRobot {
    pub fn new(config: DrivetrainConfig, params: SimParams) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                config,
                params,
                time: Duration::ZERO,
                pose: Pose::origin(),
                left: WheelState::default(),
                right: WheelState::default(),
                imu_mode: ImuMode::default(),
                imu_zero: 0.0,
                calibrating_for: Duration::ZERO,
                blocked: false,
                disconnected: false,
                events: Vec::new(),
                trace: Vec::new(),
            })),
        }
    }

    /// The drivetrain geometry of the plant.
    pub fn config(&self) -> DrivetrainConfig { self.state.borrow().config }

    /// A drivetrain handle over this plant's motors.
    pub fn drivetrain(&self) -> Differential<SimMotor> {
        let per_side = self.state.borrow().params.motors_per_side.max(1);
        let motors = |side| {
            (0..per_side)
                .map(|index| SimMotor {
                    state: self.state.clone(),
                    side,
                    index,
                })
                .collect::<Vec<_>>()
        };
        Differential::new(motors(Side::Left), motors(Side::Right))
    }

    /// An IMU handle over this plant.
    pub fn imu(&self) -> SimImu {
        SimImu {
            state: self.state.clone(),
        }
    }

    /// An odometry tracker wired to this plant's encoders and IMU.
    pub fn tracker(&self) -> OdomTracker<SimMotor, SimImu> {
        OdomTracker::new(self.drivetrain(), self.imu(), self.config())
    }

    /// Integrates the plant forward by `duration`.
    pub fn advance(&self, duration: Duration) { self.state.borrow_mut().advance(duration); }

    /// Simulated time since creation.
    pub fn now(&self) -> Duration { self.state.borrow().time }

    /// The true pose; `theta` is continuous.
    pub fn true_pose(&self) -> Pose { self.state.borrow().pose }

    /// Teleports the robot. Encoders and the IMU reference are untouched.
    pub fn set_pose(&self, pose: Pose) { self.state.borrow_mut().pose = pose; }

    /// Makes the IMU report "calibrating" for `duration` of simulated time.
    pub fn start_calibration(&self, duration: Duration) {
        self.state.borrow_mut().calibrating_for = duration;
    }

    /// Pins the robot in place, as if pushed against a wall.
    pub fn set_blocked(&self, blocked: bool) { self.state.borrow_mut().blocked = blocked; }

    pub fn set_imu_mode(&self, mode: ImuMode) { self.state.borrow_mut().imu_mode = mode; }

    /// Unplugs every device: motor and IMU calls fail with
    /// [`DeviceError::Disconnected`] until reconnected. The plant keeps moving.
    pub fn set_disconnected(&self, disconnected: bool) {
        self.state.borrow_mut().disconnected = disconnected;
    }

    /// Commands received so far.
    pub fn events(&self) -> Vec<SimEvent> { self.state.borrow().events.clone() }

    /// Plant state after every integration step.
    pub fn trace(&self) -> Vec<TraceSample> { self.state.borrow().trace.clone() }

    /// Drops recorded events and trace samples.
    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.events.clear();
        state.trace.clear();
    }
}

/// One simulated drive motor.
#[derive(Debug)]
pub struct SimMotor {
    state: Rc<RefCell<SimState>>,
    side:  Side,
    index: usize,
}

impl SimMotor {
    /// Ports are numbered from 1, left side first.
    fn port(&self) -> u8 {
        let per_side = self.state.borrow().params.motors_per_side.max(1);
        let offset = match self.side {
            Side::Left => 0,
            Side::Right => per_side,
        };
        (offset + self.index + 1) as u8
    }
}

impl DriveMotor for SimMotor {
    fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        let port = self.port();
        let mut state = self.state.borrow_mut();
        state.connected(port)?;
        let time = state.time;
        let wheel = state.wheel(self.side);
        wheel.volts = volts.clamp(-MAX_VOLTAGE, MAX_VOLTAGE);
        wheel.stopped = None;
        if self.index == 0 {
            let side = self.side;
            state.events.push(SimEvent::Voltage { time, side, volts });
        }
        Ok(())
    }

    fn brake(&mut self, mode: StopMode) -> Result<(), DeviceError> {
        let port = self.port();
        let mut state = self.state.borrow_mut();
        state.connected(port)?;
        let time = state.time;
        let wheel = state.wheel(self.side);
        wheel.volts = 0.0;
        wheel.stopped = Some(mode);
        if self.index == 0 {
            let side = self.side;
            state.events.push(SimEvent::Stop { time, side, mode });
        }
        Ok(())
    }

    fn position(&self) -> Result<f64, DeviceError> {
        let port = self.port();
        let mut state = self.state.borrow_mut();
        state.connected(port)?;
        let config = state.config;
        let wheel = state.wheel(self.side);
        Ok(config.inches_to_degrees(wheel.travel - wheel.encoder_zero))
    }

    fn reset_position(&mut self) -> Result<(), DeviceError> {
        let port = self.port();
        let mut state = self.state.borrow_mut();
        state.connected(port)?;
        let wheel = state.wheel(self.side);
        wheel.encoder_zero = wheel.travel;
        Ok(())
    }
}

/// The simulated inertial sensor.
#[derive(Debug)]
pub struct SimImu {
    state: Rc<RefCell<SimState>>,
}

impl HeadingSensor for SimImu {
    fn heading(&self) -> Result<f64, DeviceError> {
        let state = self.state.borrow();
        state.connected(IMU_PORT)?;
        let relative = state.pose.theta - state.imu_zero;
        Ok(match state.imu_mode {
            ImuMode::Bounded => relative.rem_euclid(TAU),
            ImuMode::Continuous => relative,
        })
    }

    fn reset_heading(&mut self) -> Result<(), DeviceError> {
        let mut state = self.state.borrow_mut();
        state.connected(IMU_PORT)?;
        state.imu_zero = state.pose.theta;
        Ok(())
    }

    fn is_calibrating(&self) -> Result<bool, DeviceError> {
        let state = self.state.borrow();
        state.connected(IMU_PORT)?;
        Ok(state.calibrating_for > Duration::ZERO)
    }
}

struct PeriodicTask {
    period: Duration,
    next:   Duration,
    run:    Box<dyn FnMut()>,
}

/// A [`Clock`] over simulated time.
///
/// Sleeping advances the plant and runs any periodic task that falls due, then
/// completes immediately.
pub struct SimClock {
    robot: SimRobot,
    tasks: RefCell<Vec<PeriodicTask>>,
}

impl SimClock {
    pub fn new(robot: &SimRobot) -> Self {
        Self {
            robot: robot.clone(),
            tasks: RefCell::new(Vec::new()),
        }
    }

    /// Runs `task` every `period` of simulated time, starting one period from
    /// now.
    pub fn every(&self, period: Duration, task: impl FnMut() + 'static) {
        let next = self.robot.now() + period;
        self.tasks.borrow_mut().push(PeriodicTask {
            period,
            next,
            run: Box::new(task),
        });
    }

    /// Schedules the tracker's [`poll`](OdomTracker::poll) every
    /// [`ODOM_PERIOD`] and returns a shared handle to it.
    pub fn spawn_odometry(
        &self,
        tracker: OdomTracker<SimMotor, SimImu>,
    ) -> Rc<OdomTracker<SimMotor, SimImu>> {
        let tracker = Rc::new(tracker);
        let background = tracker.clone();
        self.every(ODOM_PERIOD, move || {
            background.poll();
        });
        tracker
    }

    /// Advances simulated time by `duration`, running due tasks on the way.
    pub fn advance(&self, duration: Duration) {
        let end = self.robot.now() + duration;
        loop {
            let now = self.robot.now();
            let due = self.tasks.borrow().iter().map(|t| t.next).min();
            match due {
                Some(due) if due <= end => {
                    if due > now {
                        self.robot.advance(due - now);
                    }
                    let mut tasks = self.tasks.borrow_mut();
                    for task in tasks.iter_mut().filter(|t| t.next <= due) {
                        (task.run)();
                        task.next += task.period;
                    }
                }
                _ => {
                    if end > now {
                        self.robot.advance(end - now);
                    }
                    break;
                }
            }
        }
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration { self.robot.now() }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        self.advance(duration);
        future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::PowerUnit;

    #[test]
    fn below_static_voltage_does_not_move() {
        let robot = SimRobot::default();
        robot.drivetrain().set_power(0.8, 0.8, PowerUnit::Voltage);
        robot.advance(Duration::from_secs(1));
        assert_eq!(robot.true_pose(), Pose::origin());
    }

    #[test]
    fn full_power_reaches_free_speed() {
        let robot = SimRobot::default();
        robot.drivetrain().set_power(12.0, 12.0, PowerUnit::Voltage);
        robot.advance(Duration::from_secs(1));
        let before = robot.true_pose().x;
        robot.advance(Duration::from_secs(1));
        let speed = robot.true_pose().x - before;
        let expected = 200.0 / 60.0 * 0.75 * std::f64::consts::PI * 2.75;
        assert!((speed - expected).abs() < 0.01, "{speed} vs {expected}");
    }

    #[test]
    fn hold_stops_immediately() {
        let robot = SimRobot::default();
        let dt = robot.drivetrain();
        dt.set_power(8.0, 8.0, PowerUnit::Voltage);
        robot.advance(Duration::from_millis(300));
        dt.stop(StopMode::Hold);
        let x = robot.true_pose().x;
        robot.advance(Duration::from_millis(300));
        assert!((robot.true_pose().x - x).abs() < 0.05);
    }

    #[test]
    fn encoders_follow_travel_and_reset() {
        let robot = SimRobot::default();
        let dt = robot.drivetrain();
        dt.set_power(6.0, 6.0, PowerUnit::Voltage);
        robot.advance(Duration::from_millis(500));
        let (left, right) = dt.position().unwrap();
        let config = robot.config();
        assert!((config.degrees_to_inches(left) - robot.true_pose().x).abs() < 1e-9);
        assert!((left - right).abs() < 1e-9);
        dt.reset_position().unwrap();
        assert_eq!(dt.position().unwrap(), (0.0, 0.0));
    }

    #[test]
    fn clock_runs_periodic_tasks_on_schedule() {
        let robot = SimRobot::default();
        let clock = SimClock::new(&robot);
        let ticks = Rc::new(RefCell::new(Vec::new()));
        let seen = ticks.clone();
        let probe = robot.clone();
        clock.every(Duration::from_millis(10), move || seen.borrow_mut().push(probe.now()));
        pollster::block_on(clock.sleep(Duration::from_millis(35)));
        assert_eq!(clock.now(), Duration::from_millis(35));
        assert_eq!(
            *ticks.borrow(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(30)
            ]
        );
    }

    #[test]
    fn disconnected_devices_report_their_port() {
        let robot = SimRobot::default();
        let dt = robot.drivetrain();
        robot.set_disconnected(true);
        assert_eq!(
            dt.reset_position(),
            Err(DeviceError::Disconnected { port: 1 })
        );
        assert_eq!(
            robot.imu().is_calibrating(),
            Err(DeviceError::Disconnected { port: IMU_PORT })
        );
        robot.set_disconnected(false);
        assert!(dt.position().is_ok());
    }

    #[test]
    fn bounded_imu_wraps() {
        let robot = SimRobot::default();
        robot.set_pose(Pose::new(0.0, 0.0, -0.5));
        let imu = robot.imu();
        assert!((imu.heading().unwrap() - (TAU - 0.5)).abs() < 1e-12);
        robot.set_imu_mode(ImuMode::Continuous);
        assert!((imu.heading().unwrap() + 0.5).abs() < 1e-12);
    }
}
