// Fixed-rate control loop
//
// Each tick: take at most one pending input, fold it into the operator
// state, derive motion and head targets, drive the wheels, ramp the servos.
// The stop flag is checked at the top of every tick; on stop the base gets
// one final zero-motion command.

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

// local imports
use crate::config::{
    AXIS_MAX, ControlConfig, TILT_CENTER, TILT_DOWN, TILT_UP, WHEEL_SPEED_MAX, tick_period,
};
use crate::head::{HeadPose, ServoBank};
use crate::input::{
    AxisId, ButtonId, InputSource, InputState, KeyCommand, KeyState, Polled, RawInput,
    joystick::decode_events,
};
use crate::messages::{LoopStatus, MotionIntent};
use crate::motor::{Drivetrain, Geometry};
use crate::pwm::{PwmError, PwmSink};
use crate::selftest;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where operator intent comes from
#[derive(Debug, Clone)]
pub enum Operator {
    Joystick(InputState),
    Keyboard(KeyState),
}

impl Operator {
    pub fn joystick() -> Self {
        Self::Joystick(InputState::new())
    }

    pub fn keyboard() -> Self {
        Self::Keyboard(KeyState::default())
    }

    /// Fold one raw input into the operator state
    fn apply(&mut self, raw: RawInput) {
        match (self, raw) {
            (Self::Joystick(state), RawInput::Joystick(bytes)) => match decode_events(&bytes) {
                Ok(events) => {
                    for event in events {
                        debug!("Joystick event: {:?}", event);
                        state.apply(event);
                    }
                }
                Err(e) => warn!("Dropping joystick record: {}", e),
            },
            (Self::Keyboard(keys), RawInput::Key(c)) => match KeyCommand::from_char(c) {
                Some(cmd) => {
                    debug!("Key command: {:?}", cmd);
                    keys.apply(cmd);
                }
                None => debug!("Ignoring key {:?}", c),
            },
            (_, raw) => warn!("Input {:?} does not match the active operator", raw),
        }
    }

    fn quit_requested(&self) -> bool {
        match self {
            Self::Joystick(state) => state.pressed(ButtonId::Home),
            Self::Keyboard(keys) => keys.quit_requested(),
        }
    }

    fn motion_intent(&self, previous: MotionIntent) -> MotionIntent {
        match self {
            Self::Joystick(state) => joystick_intent(state, previous),
            Self::Keyboard(keys) => keys.intent(),
        }
    }

    fn head_pose(&self) -> HeadPose {
        match self {
            Self::Joystick(state) => joystick_pose(state),
            Self::Keyboard(_) => HeadPose::center(),
        }
    }
}

/// Map stick axes to motion; axes not seen yet keep the previous value
///
/// Right stick X turns the base; left stick sets heading and speed.
pub fn joystick_intent(state: &InputState, previous: MotionIntent) -> MotionIntent {
    let scale = WHEEL_SPEED_MAX as f64 / AXIS_MAX as f64;
    let mut intent = previous;

    if let Some(rotate) = state.axis(AxisId::RightX) {
        intent.angular_speed = -(rotate as f64) * scale;
    }

    if let (Some(lx), Some(ly)) = (state.axis(AxisId::LeftX), state.axis(AxisId::LeftY)) {
        // Stick up/left reads negative
        let x = -(lx as f64);
        let y = -(ly as f64);
        intent.heading = x.atan2(y);
        intent.linear_speed = x.hypot(y) * scale;
    }

    intent
}

/// Map hat and trigger to a head pose; hat Y (nod) wins over hat X (roll)
pub fn joystick_pose(state: &InputState) -> HeadPose {
    let hat_x = state.axis(AxisId::HatX).unwrap_or(0);
    let hat_y = state.axis(AxisId::HatY).unwrap_or(0);

    let pose = if hat_y < 0 {
        HeadPose::pitch(TILT_DOWN)
    } else if hat_y > 0 {
        HeadPose::pitch(TILT_UP)
    } else if hat_x < 0 {
        HeadPose::roll(TILT_UP, TILT_DOWN)
    } else if hat_x > 0 {
        HeadPose::roll(TILT_DOWN, TILT_UP)
    } else {
        HeadPose::pitch(TILT_CENTER)
    };

    pose.with_jaw_open(state.pressed(ButtonId::RTrigger))
}

/// Operator control of the base and head, one tick at a time
pub struct ControlLoop<S: PwmSink> {
    config: ControlConfig,
    drivetrain: Drivetrain,
    servos: ServoBank,
    operator: Operator,
    intent: MotionIntent,
    stop: bool,
    sink: S,
}

impl<S: PwmSink> ControlLoop<S> {
    pub fn new(config: ControlConfig, operator: Operator, sink: S) -> Self {
        let geometry = Geometry::with_angular_gain(config.angular_gain);
        Self {
            drivetrain: Drivetrain::new(geometry, config.motor_scale),
            servos: ServoBank::new(config.servo_rates),
            operator,
            intent: MotionIntent::stop(),
            stop: false,
            sink,
            config,
        }
    }

    pub fn intent(&self) -> MotionIntent {
        self.intent
    }

    pub fn servos(&self) -> &ServoBank {
        &self.servos
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn is_stopped(&self) -> bool {
        self.stop
    }

    /// Ask the loop to stop at the start of the next tick
    pub fn request_stop(&mut self) {
        self.stop = true;
    }

    /// Snap the tilt servos to center before the first tick
    pub fn start(&mut self) -> Result<(), PwmError> {
        if self.config.subsystems.head {
            let [left, right, _] = self.servos.commands();
            self.sink.send(left)?;
            self.sink.send(right)?;
        }
        Ok(())
    }

    /// Run one control tick
    pub fn tick(&mut self, input: &mut dyn InputSource) -> Result<LoopStatus, PwmError> {
        if self.stop {
            return Ok(LoopStatus::Stopped);
        }

        // 1. At most one pending input, never blocking
        match input.try_next() {
            Polled::Ready(raw) => self.operator.apply(raw),
            Polled::Empty => {}
            Polled::Closed => {
                warn!("Input source closed, stopping");
                self.stop = true;
            }
        }

        if self.operator.quit_requested() {
            info!("Quit requested");
            self.stop = true;
        }
        if self.stop {
            return Ok(LoopStatus::Stopped);
        }

        // 2. Targets from the current input state
        self.intent = self.operator.motion_intent(self.intent);

        // 3. Wheels
        if self.config.subsystems.drivetrain {
            self.drivetrain.drive(&mut self.sink, &self.intent)?;
        }

        // 4. Head
        if self.config.subsystems.head {
            self.servos.set_pose(&self.operator.head_pose());
            self.servos.advance();
            self.servos.emit(&mut self.sink)?;
        }

        Ok(LoopStatus::Running)
    }

    /// Final zero-motion command after the loop ends
    pub fn shutdown(&mut self) -> Result<(), PwmError> {
        self.stop = true;
        self.intent = MotionIntent::stop();
        if self.config.subsystems.drivetrain {
            info!("Stopping base");
            self.drivetrain.stop(&mut self.sink)?;
        }
        Ok(())
    }
}

/// Drive the control loop at the configured rate until stopped
///
/// Returns the sink so the caller can release it.
pub async fn run<S: PwmSink>(
    mut control: ControlLoop<S>,
    mut input: impl InputSource,
) -> Result<S, BoxError> {
    let period = control.config.tick_period();
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Control loop started: {}Hz, drivetrain={}, head={}",
        control.config.loop_hz, control.config.subsystems.drivetrain, control.config.subsystems.head
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    control.start()?;

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = &mut ctrl_c, if !interrupted => {
                info!("Interrupted");
                interrupted = true;
                control.request_stop();
            }
        }

        if control.tick(&mut input)? == LoopStatus::Stopped {
            break;
        }
    }

    control.shutdown()?;
    info!("Control loop stopped");
    Ok(control.into_sink())
}

/// Play the actuator exercise sequence, one frame per tick
pub async fn run_self_test<S: PwmSink>(mut sink: S, loop_hz: u64) -> Result<S, BoxError> {
    let frames = selftest::sequence();
    let mut tick = interval(tick_period(loop_hz));

    info!("Self-test: {} frames at {}Hz", frames.len(), loop_hz);
    for frame in frames {
        tick.tick().await;
        for cmd in frame {
            sink.send(cmd)?;
        }
    }
    info!("Self-test complete");
    Ok(sink)
}
