//! Pin bindings for the lamp controller board.
//!
//! | Role               | Pin | Mode                |
//! |--------------------|-----|---------------------|
//! | Light relay        | PA0 | push-pull, low=off  |
//! | PIR motion input   | PA1 | input, pull-down    |
//! | Debug indicator    | PA5 | push-pull (LED)     |
//! | Ranging trigger    | PA6 | push-pull           |
//! | Ranging echo input | PA7 | input, pull-down    |
//!
//! The pull-downs keep a disconnected sensor reading "no motion" and "no
//! echo"; a missing ranging module then stalls the ping state machine and
//! the lamp keeps running on motion alone.

use embassy_stm32::gpio::{Input, Output};
use embassy_time::{Duration, Instant, block_for};

use presence_core::clock::{Micros, Millis, MonotonicClock};
use presence_core::control::{PresenceOutputs, SensorLevels};
use presence_core::ranging::PingTrigger;

/// Output pins driven by the control loop.
pub struct HardwareOutputs<'d> {
    light: Output<'d>,
    indicator: Output<'d>,
    trigger: Output<'d>,
}

impl<'d> HardwareOutputs<'d> {
    pub fn new(light: Output<'d>, indicator: Output<'d>, mut trigger: Output<'d>) -> Self {
        trigger.set_low();
        Self {
            light,
            indicator,
            trigger,
        }
    }
}

impl PingTrigger for HardwareOutputs<'_> {
    fn pulse(&mut self, width: Micros) {
        self.trigger.set_high();
        block_for(Duration::from_micros(u64::from(width.ticks())));
        self.trigger.set_low();
    }
}

impl PresenceOutputs for HardwareOutputs<'_> {
    fn set_light(&mut self, on: bool) {
        self.light.set_level(on.into());
    }

    fn set_indicator(&mut self, on: bool) {
        self.indicator.set_level(on.into());
    }
}

/// Input pins sampled once per tick.
pub struct SensorInputs<'d> {
    motion: Input<'d>,
    echo: Input<'d>,
}

impl<'d> SensorInputs<'d> {
    pub fn new(motion: Input<'d>, echo: Input<'d>) -> Self {
        Self { motion, echo }
    }

    pub fn sample(&self) -> SensorLevels {
        SensorLevels {
            motion: self.motion.is_high(),
            echo: self.echo.is_high(),
        }
    }
}

/// Embassy time driver exposed as the two wrapping counters.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmbassyClock;

impl MonotonicClock for EmbassyClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_millis(&self) -> Millis {
        // Truncation is the wrap.
        Millis::new(Instant::now().as_millis() as u32)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn now_micros(&self) -> Micros {
        Micros::new(Instant::now().as_micros() as u32)
    }
}
