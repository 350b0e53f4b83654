use presence_core::clock::Micros;
use presence_core::ranging::{
    DEFAULT_TRIGGER_PULSE, NoopPingTrigger, PingTrigger, RangeFinder, RangeState, echo_threshold,
};

struct PulseLog {
    widths: heapless::Vec<Micros, 8>,
}

impl PingTrigger for PulseLog {
    fn pulse(&mut self, width: Micros) {
        let _ = self.widths.push(width);
    }
}

/// Runs one full ping cycle with an echo of `echo_width` starting at `start`.
fn ping(finder: &mut RangeFinder, start: Micros, echo_width: u32) -> Option<bool> {
    let mut trigger = NoopPingTrigger::new();
    assert_eq!(finder.advance(start, false, &mut trigger), None);
    let rise = start.wrapping_add(Micros::new(450));
    assert_eq!(finder.advance(rise, true, &mut trigger), None);
    let fall = rise.wrapping_add(Micros::new(echo_width));
    finder.advance(fall, false, &mut trigger)
}

#[test]
fn echo_nearer_than_threshold_detects() {
    let mut finder = RangeFinder::new(24, DEFAULT_TRIGGER_PULSE);
    assert_eq!(ping(&mut finder, Micros::ZERO, 2 * 74 * 23), Some(true));
    assert_eq!(finder.state(), RangeState::Idle);
}

#[test]
fn echo_farther_than_threshold_does_not_detect() {
    let mut finder = RangeFinder::new(24, DEFAULT_TRIGGER_PULSE);
    assert_eq!(ping(&mut finder, Micros::ZERO, 2 * 74 * 25), Some(false));
}

#[test]
fn echo_at_threshold_does_not_detect() {
    let mut finder = RangeFinder::new(24, DEFAULT_TRIGGER_PULSE);
    let width = echo_threshold(24).ticks();
    assert_eq!(ping(&mut finder, Micros::ZERO, width), Some(false));
    assert_eq!(ping(&mut finder, Micros::new(100_000), width - 1), Some(true));
}

#[test]
fn echo_timing_survives_counter_wrap() {
    let mut finder = RangeFinder::new(24, DEFAULT_TRIGGER_PULSE);
    let start = Micros::new(u32::MAX - 1_000);
    assert_eq!(ping(&mut finder, start, 2 * 74 * 23), Some(true));
}

#[test]
fn echo_already_high_is_taken_as_rising_edge() {
    let mut finder = RangeFinder::new(24, DEFAULT_TRIGGER_PULSE);
    let mut trigger = NoopPingTrigger::new();

    // Trigger tick sees a stale high level and ignores it.
    assert_eq!(finder.advance(Micros::new(0), true, &mut trigger), None);
    assert_eq!(finder.state(), RangeState::WaitingForEcho);

    assert_eq!(finder.advance(Micros::new(100), true, &mut trigger), None);
    assert_eq!(
        finder.state(),
        RangeState::MeasuringEcho {
            echo_start: Micros::new(100)
        }
    );
    assert_eq!(finder.advance(Micros::new(600), false, &mut trigger), Some(true));
}

#[test]
fn stuck_echo_stalls_in_measuring() {
    let mut finder = RangeFinder::new(24, DEFAULT_TRIGGER_PULSE);
    let mut trigger = NoopPingTrigger::new();
    finder.advance(Micros::new(0), false, &mut trigger);
    finder.advance(Micros::new(100), true, &mut trigger);

    for tick in 2..10_000u32 {
        assert_eq!(finder.advance(Micros::new(tick * 100), true, &mut trigger), None);
    }
    assert!(matches!(finder.state(), RangeState::MeasuringEcho { .. }));
}

#[test]
fn trigger_uses_configured_pulse_width() {
    let mut finder = RangeFinder::new(24, Micros::new(12));
    let mut log = PulseLog {
        widths: heapless::Vec::new(),
    };

    finder.advance(Micros::new(0), false, &mut log);
    finder.advance(Micros::new(100), true, &mut log);
    finder.advance(Micros::new(200), false, &mut log);
    finder.advance(Micros::new(300), false, &mut log);

    assert_eq!(log.widths.as_slice(), &[Micros::new(12), Micros::new(12)]);
}
