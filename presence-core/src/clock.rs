//! Wrapping monotonic timestamps.
//!
//! The controller samples two free-running counters every tick: a coarse
//! millisecond counter for the hold timer and warm-up gate, and a fine
//! microsecond counter for echo timing. Both are plain `u32` values that wrap
//! at 2^32. Elapsed time is always computed with `wrapping_sub`, which yields
//! the correct span for any two samples taken less than one counter period
//! apart. The two resolutions are independent counters and deliberately offer
//! no conversion between each other.

use core::time::Duration;

/// Millisecond-resolution sample of the coarse monotonic counter.
///
/// The same type doubles as a span of milliseconds (for example the hold
/// interval) since both live on the same wrapping `u32` ring.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Millis(u32);

impl Millis {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Raw counter value.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Elapsed span from `earlier` to `self`, modulo the counter period.
    #[must_use]
    pub const fn wrapping_since(self, earlier: Self) -> Self {
        Self(self.0.wrapping_sub(earlier.0))
    }

    /// Moves the sample back by `span`, wrapping below zero.
    #[must_use]
    pub const fn wrapping_sub(self, span: Self) -> Self {
        Self(self.0.wrapping_sub(span.0))
    }

    /// Moves the sample forward by `span`, wrapping past the counter period.
    #[must_use]
    pub const fn wrapping_add(self, span: Self) -> Self {
        Self(self.0.wrapping_add(span.0))
    }

    /// Converts a [`Duration`] into a millisecond span, saturating at `u32::MAX`.
    #[must_use]
    pub fn from_duration(duration: Duration) -> Self {
        Self(u32::try_from(duration.as_millis()).unwrap_or(u32::MAX))
    }

    /// Interprets the value as a span and converts it to a [`Duration`].
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.0 as u64)
    }
}

impl From<u32> for Millis {
    fn from(ticks: u32) -> Self {
        Self(ticks)
    }
}

/// Microsecond-resolution sample of the fine monotonic counter.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Micros(u32);

impl Micros {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Raw counter value.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Elapsed span from `earlier` to `self`, modulo the counter period.
    #[must_use]
    pub const fn wrapping_since(self, earlier: Self) -> Self {
        Self(self.0.wrapping_sub(earlier.0))
    }

    /// Moves the sample forward by `span`, wrapping past the counter period.
    #[must_use]
    pub const fn wrapping_add(self, span: Self) -> Self {
        Self(self.0.wrapping_add(span.0))
    }

    /// Converts a [`Duration`] into a microsecond span, saturating at `u32::MAX`.
    #[must_use]
    pub fn from_duration(duration: Duration) -> Self {
        Self(u32::try_from(duration.as_micros()).unwrap_or(u32::MAX))
    }

    /// Interprets the value as a span and converts it to a [`Duration`].
    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_micros(self.0 as u64)
    }
}

impl From<u32> for Micros {
    fn from(ticks: u32) -> Self {
        Self(ticks)
    }
}

/// Both counters sampled at the start of a control-loop tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TickInstant {
    pub millis: Millis,
    pub micros: Micros,
}

impl TickInstant {
    #[must_use]
    pub const fn new(millis: Millis, micros: Micros) -> Self {
        Self { millis, micros }
    }
}

/// Source of the two wrapping counters.
pub trait MonotonicClock {
    /// Samples the coarse millisecond counter.
    fn now_millis(&self) -> Millis;

    /// Samples the fine microsecond counter.
    fn now_micros(&self) -> Micros;

    /// Samples both counters for a single tick.
    fn sample(&self) -> TickInstant {
        TickInstant::new(self.now_millis(), self.now_micros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_survives_counter_wrap() {
        let before = Millis::new(u32::MAX - 9);
        let after = Millis::new(20);
        assert_eq!(after.wrapping_since(before), Millis::new(30));

        let start = Micros::new(u32::MAX);
        let end = Micros::new(99);
        assert_eq!(end.wrapping_since(start), Micros::new(100));
    }

    #[test]
    fn wrapping_sub_goes_below_zero() {
        let origin = Millis::ZERO.wrapping_sub(Millis::new(90_000));
        assert_eq!(origin.ticks(), u32::MAX - 89_999);
        assert_eq!(Millis::ZERO.wrapping_since(origin), Millis::new(90_000));
    }

    #[test]
    fn duration_conversion_saturates() {
        assert_eq!(Millis::from_duration(Duration::from_secs(90)), Millis::new(90_000));
        assert_eq!(
            Millis::from_duration(Duration::from_secs(u64::MAX)),
            Millis::new(u32::MAX)
        );
        assert_eq!(Micros::from_duration(Duration::from_micros(10)), Micros::new(10));
        assert_eq!(Micros::new(148).as_duration(), Duration::from_micros(148));
    }
}
