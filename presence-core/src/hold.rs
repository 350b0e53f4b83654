//! Light hold timer fed by fused detections.

use crate::clock::Millis;

/// Persistent fusion state: the timestamp of the most recent detection.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HoldState {
    last_detection: Millis,
}

impl HoldState {
    /// Seeds the state one full hold interval before `now` so the light
    /// starts OFF.
    #[must_use]
    pub const fn expired_at(now: Millis, hold_interval: Millis) -> Self {
        Self {
            last_detection: now.wrapping_sub(hold_interval),
        }
    }

    #[must_use]
    pub const fn last_detection(&self) -> Millis {
        self.last_detection
    }
}

/// Derives the light output from the most recent detection.
///
/// Both sensors report into the controller through [`record_detection`]; it
/// is the only writer of [`HoldState`] apart from the re-arm clamp applied by
/// [`is_light_on`].
///
/// [`record_detection`]: LightHoldController::record_detection
/// [`is_light_on`]: LightHoldController::is_light_on
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LightHoldController {
    state: HoldState,
}

impl LightHoldController {
    /// Creates a controller whose light is OFF at `now`.
    #[must_use]
    pub const fn new(now: Millis, hold_interval: Millis) -> Self {
        Self {
            state: HoldState::expired_at(now, hold_interval),
        }
    }

    /// Restarts the hold interval from `now`.
    pub fn record_detection(&mut self, now: Millis) {
        self.state.last_detection = now;
    }

    /// Returns `true` while `now` is strictly inside the hold interval.
    ///
    /// Once the interval has lapsed, the last detection is pulled forward to
    /// exactly `now - hold_interval`. Without the clamp a long idle period
    /// would let the stored timestamp drift more than half a counter period
    /// into the past, after which the wrapping age would read as recent again.
    pub fn is_light_on(&mut self, now: Millis, hold_interval: Millis) -> bool {
        let age = now.wrapping_since(self.state.last_detection);
        if age.ticks() < hold_interval.ticks() {
            return true;
        }

        self.state.last_detection = now.wrapping_sub(hold_interval);
        false
    }

    #[must_use]
    pub const fn last_detection(&self) -> Millis {
        self.state.last_detection()
    }

    #[must_use]
    pub const fn state(&self) -> HoldState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: Millis = Millis::new(90_000);

    #[test]
    fn starts_off() {
        let mut hold = LightHoldController::new(Millis::ZERO, HOLD);
        assert!(!hold.is_light_on(Millis::ZERO, HOLD));
        assert!(!hold.is_light_on(Millis::new(5), HOLD));
    }

    #[test]
    fn boundary_is_exclusive() {
        let mut hold = LightHoldController::new(Millis::ZERO, HOLD);
        hold.record_detection(Millis::new(10));
        assert!(hold.is_light_on(Millis::new(10), HOLD));
        assert!(hold.is_light_on(Millis::new(90_009), HOLD));
        assert!(!hold.is_light_on(Millis::new(90_010), HOLD));
    }

    #[test]
    fn clamp_keeps_age_at_interval() {
        let mut hold = LightHoldController::new(Millis::ZERO, HOLD);
        hold.record_detection(Millis::new(1_000));

        let now = Millis::new(500_000);
        assert!(!hold.is_light_on(now, HOLD));
        assert_eq!(hold.last_detection(), Millis::new(410_000));
    }

    #[test]
    fn repeated_detection_within_tick_is_idempotent() {
        let mut hold = LightHoldController::new(Millis::ZERO, HOLD);
        hold.record_detection(Millis::new(42));
        let once = hold.state();
        hold.record_detection(Millis::new(42));
        assert_eq!(hold.state(), once);
    }
}
