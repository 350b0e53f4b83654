//! Per-tick fusion of the motion and ranging sensors.
//!
//! A tick runs one synchronous pass in a fixed order:
//!
//! 1. derive the light level from detections recorded in earlier ticks and
//!    drive the light output;
//! 2. poll the gated motion sensor;
//! 3. advance the ranging protocol, which may pulse the trigger;
//! 4. fold either detection into the hold timer;
//! 5. mirror the fused detection onto the indicator when debugging.
//!
//! A detection therefore reaches the light output on the tick after it was
//! observed.

use core::fmt;
use core::time::Duration;

use crate::clock::{Micros, Millis, TickInstant};
use crate::config::PresenceConfig;
use crate::hold::LightHoldController;
use crate::motion::MotionSensor;
use crate::ranging::{NoopPingTrigger, PingTrigger, RangeFinder, echo_threshold};
use crate::telemetry::{TelemetryEventKind, TelemetryRecorder};

/// Tick period used by the firmware and emulator.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_micros(100);

/// Echo width of an object one inch away; the shortest pulse the loop must
/// be able to observe.
pub const MIN_ECHO_PULSE: Micros = echo_threshold(1);

/// Largest share of a tick the blocking trigger pulse may take, as a divisor.
pub const MAX_TRIGGER_SHARE_DIVISOR: u32 = 4;

/// Raw input levels sampled at the start of a tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SensorLevels {
    pub motion: bool,
    pub echo: bool,
}

/// Output side of the controller.
pub trait PresenceOutputs: PingTrigger {
    fn set_light(&mut self, on: bool);

    fn set_indicator(&mut self, on: bool);
}

/// Outputs that perform no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopPresenceOutputs {
    trigger: NoopPingTrigger,
}

impl NoopPresenceOutputs {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trigger: NoopPingTrigger::new(),
        }
    }
}

impl PingTrigger for NoopPresenceOutputs {
    fn pulse(&mut self, width: Micros) {
        self.trigger.pulse(width);
    }
}

impl PresenceOutputs for NoopPresenceOutputs {
    fn set_light(&mut self, _: bool) {}

    fn set_indicator(&mut self, _: bool) {}
}

/// Summary of a single tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TickReport {
    /// Level driven onto the light output.
    pub light_on: bool,
    /// `true` when `light_on` differs from the previous tick.
    pub light_changed: bool,
    /// Gated motion level.
    pub motion: bool,
    /// Result of a ping cycle that completed this tick.
    pub range: Option<bool>,
    /// OR of both detections, folded into the hold timer.
    pub detected: bool,
}

/// Owns the hold timer and both sensor front-ends.
#[derive(Copy, Clone, Debug)]
pub struct PresenceController {
    hold_interval: Millis,
    debug_enabled: bool,
    hold: LightHoldController,
    motion: MotionSensor,
    ranging: RangeFinder,
    light_on: bool,
    motion_level: bool,
    object_near: bool,
    warmup_reported: bool,
}

impl PresenceController {
    /// Creates a controller whose light is OFF at `now`.
    #[must_use]
    pub fn new(config: &PresenceConfig, now: Millis) -> Self {
        Self::with_motion_sensor(config, now, MotionSensor::new(config.warmup_millis()))
    }

    /// Creates a controller around a caller-supplied motion sensor.
    #[must_use]
    pub fn with_motion_sensor(config: &PresenceConfig, now: Millis, motion: MotionSensor) -> Self {
        let hold_interval = config.hold_interval_millis();
        Self {
            hold_interval,
            debug_enabled: config.debug_enabled,
            hold: LightHoldController::new(now, hold_interval),
            motion,
            ranging: RangeFinder::with_threshold(
                config.range_threshold(),
                config.trigger_pulse_micros(),
            ),
            light_on: false,
            motion_level: false,
            object_near: false,
            warmup_reported: motion.is_warmed_up(),
        }
    }

    /// Runs one control-loop pass.
    pub fn tick<O>(&mut self, now: TickInstant, inputs: SensorLevels, outputs: &mut O) -> TickReport
    where
        O: PresenceOutputs + ?Sized,
    {
        let light_on = self.hold.is_light_on(now.millis, self.hold_interval);
        outputs.set_light(light_on);
        let light_changed = light_on != self.light_on;
        self.light_on = light_on;

        let motion = self.motion.poll(inputs.motion, now.millis);
        let range = self.ranging.advance(now.micros, inputs.echo, outputs);

        let detected = motion || range == Some(true);
        if detected {
            self.hold.record_detection(now.millis);
        }

        if self.debug_enabled {
            outputs.set_indicator(detected);
        }

        self.motion_level = motion;
        if let Some(near) = range {
            self.object_near = near;
        }

        TickReport {
            light_on,
            light_changed,
            motion,
            range,
            detected,
        }
    }

    /// Runs one pass and records light transitions and sensor edges.
    pub fn tick_with_telemetry<O, const N: usize>(
        &mut self,
        now: TickInstant,
        inputs: SensorLevels,
        outputs: &mut O,
        telemetry: &mut TelemetryRecorder<N>,
    ) -> TickReport
    where
        O: PresenceOutputs + ?Sized,
    {
        let was_moving = self.motion_level;
        let was_near = self.object_near;
        let report = self.tick(now, inputs, outputs);
        let timestamp = now.millis;

        if report.light_changed {
            telemetry.record_light_change(report.light_on, timestamp);
        }
        if !self.warmup_reported && self.motion.is_warmed_up() {
            self.warmup_reported = true;
            telemetry.record_event(TelemetryEventKind::WarmupComplete, timestamp);
        }
        if report.motion && !was_moving {
            telemetry.record_event(TelemetryEventKind::MotionDetected, timestamp);
        }
        match report.range {
            Some(true) if !was_near => {
                telemetry.record_event(TelemetryEventKind::ObjectNear, timestamp);
            }
            Some(false) if was_near => {
                telemetry.record_event(TelemetryEventKind::ObjectCleared, timestamp);
            }
            _ => {}
        }

        report
    }

    /// Level driven onto the light output by the most recent tick.
    #[must_use]
    pub const fn light_on(&self) -> bool {
        self.light_on
    }

    #[must_use]
    pub const fn hold_interval(&self) -> Millis {
        self.hold_interval
    }

    #[must_use]
    pub const fn hold(&self) -> &LightHoldController {
        &self.hold
    }

    #[must_use]
    pub const fn motion(&self) -> &MotionSensor {
        &self.motion
    }

    #[must_use]
    pub const fn ranging(&self) -> &RangeFinder {
        &self.ranging
    }

    /// Last completed ping result, `false` until one completes.
    #[must_use]
    pub const fn object_near(&self) -> bool {
        self.object_near
    }
}

/// Timing precondition the driving loop must meet for echo edges to be seen.
///
/// The ranging protocol only observes the echo line when polled. A tick
/// period at least as long as the narrowest echo can skip a whole pulse, and
/// a trigger pulse that eats a large share of the tick skews the loop rate.
///
/// The narrowest echo is the one-inch reflection ([`MIN_ECHO_PULSE`]), not
/// the configured distance: an object closer than the threshold still has
/// to raise and drop the echo between two polls to count as near.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControlLoopContract {
    pub tick_period: Micros,
    pub narrowest_echo: Micros,
    pub trigger_pulse: Micros,
}

impl ControlLoopContract {
    #[must_use]
    pub fn new(tick_period: Duration, config: &PresenceConfig) -> Self {
        Self {
            tick_period: Micros::from_duration(tick_period),
            narrowest_echo: MIN_ECHO_PULSE,
            trigger_pulse: config.trigger_pulse_micros(),
        }
    }

    /// Checks the tick period against the echo and trigger widths.
    ///
    /// # Errors
    ///
    /// Returns the first [`ContractViolation`] found.
    pub fn check(&self) -> Result<(), ContractViolation> {
        if self.tick_period.ticks() >= self.narrowest_echo.ticks() {
            return Err(ContractViolation::TickTooSlow {
                tick_period: self.tick_period,
                narrowest_echo: self.narrowest_echo,
            });
        }
        if self.trigger_pulse.ticks().saturating_mul(MAX_TRIGGER_SHARE_DIVISOR)
            > self.tick_period.ticks()
        {
            return Err(ContractViolation::TriggerTooLong {
                trigger_pulse: self.trigger_pulse,
                tick_period: self.tick_period,
            });
        }
        Ok(())
    }
}

/// Reason a tick period fails [`ControlLoopContract::check`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContractViolation {
    TickTooSlow {
        tick_period: Micros,
        narrowest_echo: Micros,
    },
    TriggerTooLong {
        trigger_pulse: Micros,
        tick_period: Micros,
    },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::TickTooSlow {
                tick_period,
                narrowest_echo,
            } => write!(
                f,
                "tick period {}us is not shorter than the narrowest echo {}us",
                tick_period.ticks(),
                narrowest_echo.ticks()
            ),
            ContractViolation::TriggerTooLong {
                trigger_pulse,
                tick_period,
            } => write!(
                f,
                "trigger pulse {}us exceeds 1/{} of the {}us tick",
                trigger_pulse.ticks(),
                MAX_TRIGGER_SHARE_DIVISOR,
                tick_period.ticks()
            ),
        }
    }
}
