//! Non-blocking ultrasonic ping/echo protocol.
//!
//! A ranging module answers a short trigger pulse by raising its echo line
//! for as long as the sound took to travel to the nearest reflector and
//! back. Rather than waiting on the echo in place, the protocol is split
//! into three states and advanced by exactly one transition per control-loop
//! tick:
//!
//! ```text
//! Idle --(pulse trigger)--> WaitingForEcho --(echo high)--> MeasuringEcho
//!  ^                                                             |
//!  +---------------------(echo low, emit result)-----------------+
//! ```
//!
//! There is no timeout out of `WaitingForEcho` or `MeasuringEcho`. If the
//! echo line never moves (disconnected sensor), the machine stalls and stops
//! producing results; motion detection keeps working on its own.
//!
//! Echo edges are only seen when the loop polls, so the measured width is
//! quantised to the tick period. The driving loop must poll faster than the
//! narrowest echo it needs to resolve; see [`crate::control::ControlLoopContract`].

use crate::clock::Micros;

/// Round-trip echo time per inch of target distance, in microseconds.
///
/// Sound covers roughly 13.5 inches per millisecond at room temperature; one
/// inch out and back takes about 148 µs, i.e. 74 µs per inch each way.
pub const ROUND_TRIP_MICROS_PER_INCH: u32 = 74;

/// Trigger pulse width required by HC-SR04 class modules.
pub const DEFAULT_TRIGGER_PULSE: Micros = Micros::new(10);

/// Echo width below which an object counts as "near".
#[must_use]
pub const fn echo_threshold(distance_inches: u16) -> Micros {
    Micros::new(2 * ROUND_TRIP_MICROS_PER_INCH * distance_inches as u32)
}

/// Protocol phase, carrying the echo start time while measuring.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RangeState {
    #[default]
    Idle,
    WaitingForEcho,
    MeasuringEcho {
        echo_start: Micros,
    },
}

/// Side effect requested by a transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RangeAction {
    /// Emit one trigger pulse to start a ping.
    Trigger,
}

/// Result of feeding one tick into [`RangeState::step`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RangeTransition {
    pub next: RangeState,
    pub action: Option<RangeAction>,
    /// `Some(near)` once per completed ping cycle.
    pub detection: Option<bool>,
}

impl RangeTransition {
    const fn silent(next: RangeState) -> Self {
        Self {
            next,
            action: None,
            detection: None,
        }
    }
}

impl RangeState {
    /// Pure transition function for one tick.
    ///
    /// An echo that is already high when waiting starts (left over from a
    /// spurious trigger) is accepted as the rising edge; no glitch filtering
    /// is performed.
    #[must_use]
    pub const fn step(self, now: Micros, echo_high: bool, threshold: Micros) -> RangeTransition {
        match self {
            RangeState::Idle => RangeTransition {
                next: RangeState::WaitingForEcho,
                action: Some(RangeAction::Trigger),
                detection: None,
            },
            RangeState::WaitingForEcho if echo_high => {
                RangeTransition::silent(RangeState::MeasuringEcho { echo_start: now })
            }
            RangeState::MeasuringEcho { echo_start } if !echo_high => {
                let elapsed = now.wrapping_since(echo_start);
                RangeTransition {
                    next: RangeState::Idle,
                    action: None,
                    detection: Some(elapsed.ticks() < threshold.ticks()),
                }
            }
            state => RangeTransition::silent(state),
        }
    }

    /// Returns `true` while a ping is outstanding.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        !matches!(self, RangeState::Idle)
    }
}

/// Abstraction over the trigger output of the ranging module.
pub trait PingTrigger {
    /// Drives the trigger high for `width`, then low again.
    ///
    /// This is the only blocking call in the control loop.
    fn pulse(&mut self, width: Micros);
}

/// Trigger that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopPingTrigger;

impl NoopPingTrigger {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PingTrigger for NoopPingTrigger {
    fn pulse(&mut self, _: Micros) {}
}

/// Drives [`RangeState`] and executes the trigger pulses it requests.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RangeFinder {
    state: RangeState,
    threshold: Micros,
    pulse_width: Micros,
}

impl RangeFinder {
    /// Creates a range finder that reports objects nearer than `distance_inches`.
    #[must_use]
    pub const fn new(distance_inches: u16, pulse_width: Micros) -> Self {
        Self::with_threshold(echo_threshold(distance_inches), pulse_width)
    }

    /// Creates a range finder with an explicit echo-width threshold.
    #[must_use]
    pub const fn with_threshold(threshold: Micros, pulse_width: Micros) -> Self {
        Self {
            state: RangeState::Idle,
            threshold,
            pulse_width,
        }
    }

    /// Performs at most one protocol transition.
    ///
    /// Returns `Some(near)` only when a ping cycle completes.
    pub fn advance<T>(&mut self, now: Micros, echo_high: bool, trigger: &mut T) -> Option<bool>
    where
        T: PingTrigger + ?Sized,
    {
        let transition = self.state.step(now, echo_high, self.threshold);
        if let Some(RangeAction::Trigger) = transition.action {
            trigger.pulse(self.pulse_width);
        }
        self.state = transition.next;
        transition.detection
    }

    #[must_use]
    pub const fn state(&self) -> RangeState {
        self.state
    }

    #[must_use]
    pub const fn threshold(&self) -> Micros {
        self.threshold
    }

    #[must_use]
    pub const fn pulse_width(&self) -> Micros {
        self.pulse_width
    }
}
