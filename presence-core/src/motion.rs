//! PIR input with a one-shot warm-up gate.
//!
//! Debounce and retrigger suppression are configured on the sensor module
//! itself; the only filtering done here is ignoring everything the sensor
//! reports while it stabilises after power-up.

use crate::clock::Millis;

/// Latch that flips once the warm-up window has passed and never resets.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WarmupState {
    complete: bool,
}

impl WarmupState {
    #[must_use]
    pub const fn pending() -> Self {
        Self { complete: false }
    }

    #[must_use]
    pub const fn complete() -> Self {
        Self { complete: true }
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.complete
    }
}

/// Gated view of the raw motion-sensor level.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MotionSensor {
    warmup: Millis,
    state: WarmupState,
}

impl MotionSensor {
    /// Sensor that ignores readings until the coarse clock passes `warmup`.
    #[must_use]
    pub const fn new(warmup: Millis) -> Self {
        Self {
            warmup,
            state: WarmupState::pending(),
        }
    }

    /// Sensor whose warm-up window has already elapsed.
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            warmup: Millis::ZERO,
            state: WarmupState::complete(),
        }
    }

    /// Returns the gated motion level for this tick.
    ///
    /// `now` is compared directly against the warm-up length, so the gate
    /// assumes the millisecond counter started from zero at boot.
    pub fn poll(&mut self, raw_high: bool, now: Millis) -> bool {
        if !self.state.complete {
            if now.ticks() > self.warmup.ticks() {
                self.state.complete = true;
            } else {
                return false;
            }
        }

        raw_high
    }

    #[must_use]
    pub const fn is_warmed_up(&self) -> bool {
        self.state.is_complete()
    }

    #[must_use]
    pub const fn warmup(&self) -> Millis {
        self.warmup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_motion_until_window_passes() {
        let mut sensor = MotionSensor::new(Millis::new(60_000));
        assert!(!sensor.poll(true, Millis::ZERO));
        assert!(!sensor.poll(true, Millis::new(60_000)));
        assert!(!sensor.is_warmed_up());

        assert!(sensor.poll(true, Millis::new(60_001)));
        assert!(sensor.is_warmed_up());
        assert!(!sensor.poll(false, Millis::new(60_002)));
    }

    #[test]
    fn latch_survives_counter_wrap() {
        let mut sensor = MotionSensor::new(Millis::new(60_000));
        assert!(!sensor.poll(false, Millis::new(60_001)));
        assert!(sensor.is_warmed_up());

        // Counter wrapped back below the warm-up length; the latch holds.
        assert!(sensor.poll(true, Millis::new(5)));
    }

    #[test]
    fn ready_sensor_passes_level_through() {
        let mut sensor = MotionSensor::ready();
        assert!(sensor.poll(true, Millis::ZERO));
        assert!(!sensor.poll(false, Millis::ZERO));
    }
}
