//! Presence telemetry ring shared by firmware and host targets.
//!
//! The controller records light transitions and sensor edges into a bounded
//! history so the firmware can mirror them over defmt and the emulator can
//! print them. Sensor events are recorded on edges only; a sensor that stays
//! asserted for minutes produces one record, not one per tick.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::clock::Millis;

/// Identifier assigned to each telemetry record.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    LightOn,
    LightOff,
    /// Gated motion level rose.
    MotionDetected,
    /// A ping cycle reported an object nearer than the threshold after one
    /// that did not.
    ObjectNear,
    /// A ping cycle reported no near object after one that did.
    ObjectCleared,
    WarmupComplete,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::LightOn => f.write_str("light-on"),
            TelemetryEventKind::LightOff => f.write_str("light-off"),
            TelemetryEventKind::MotionDetected => f.write_str("motion-detected"),
            TelemetryEventKind::ObjectNear => f.write_str("object-near"),
            TelemetryEventKind::ObjectCleared => f.write_str("object-cleared"),
            TelemetryEventKind::WarmupComplete => f.write_str("warmup-complete"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const LIGHT_ON_CODE: u16 = 0x0001;
    const LIGHT_OFF_CODE: u16 = 0x0002;
    const MOTION_CODE: u16 = 0x0010;
    const OBJECT_NEAR_CODE: u16 = 0x0020;
    const OBJECT_CLEARED_CODE: u16 = 0x0021;
    const WARMUP_CODE: u16 = 0x0030;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::LightOn => Self::LIGHT_ON_CODE,
            TelemetryEventKind::LightOff => Self::LIGHT_OFF_CODE,
            TelemetryEventKind::MotionDetected => Self::MOTION_CODE,
            TelemetryEventKind::ObjectNear => Self::OBJECT_NEAR_CODE,
            TelemetryEventKind::ObjectCleared => Self::OBJECT_CLEARED_CODE,
            TelemetryEventKind::WarmupComplete => Self::WARMUP_CODE,
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEventKind::Custom`].
    #[must_use]
    pub const fn from_raw(code: u16) -> Self {
        match code {
            Self::LIGHT_ON_CODE => TelemetryEventKind::LightOn,
            Self::LIGHT_OFF_CODE => TelemetryEventKind::LightOff,
            Self::MOTION_CODE => TelemetryEventKind::MotionDetected,
            Self::OBJECT_NEAR_CODE => TelemetryEventKind::ObjectNear,
            Self::OBJECT_CLEARED_CODE => TelemetryEventKind::ObjectCleared,
            Self::WARMUP_CODE => TelemetryEventKind::WarmupComplete,
            other => TelemetryEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    None,
    Light(LightTelemetry),
}

/// Light transition payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightTelemetry {
    /// Time spent in the previous light state, if a previous transition
    /// was recorded.
    pub previous_for: Option<Millis>,
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Millis,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    last_light_change: Option<Millis>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_light_change: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Identifier the next record will receive.
    pub const fn next_id(&self) -> EventId {
        self.next_event_id
    }

    /// Records a light transition and how long the previous state lasted.
    pub fn record_light_change(&mut self, on: bool, timestamp: Millis) -> EventId {
        let previous_for = self
            .last_light_change
            .map(|previous| timestamp.wrapping_since(previous));
        self.last_light_change = Some(timestamp);

        let event = if on {
            TelemetryEventKind::LightOn
        } else {
            TelemetryEventKind::LightOff
        };
        self.record(
            event,
            TelemetryPayload::Light(LightTelemetry { previous_for }),
            timestamp,
        )
    }

    /// Records an event without extra payload.
    pub fn record_event(&mut self, event: TelemetryEventKind, timestamp: Millis) -> EventId {
        self.record(event, TelemetryPayload::None, timestamp)
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: Millis,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_codes_round_trip() {
        let fixtures = [
            TelemetryEventKind::LightOn,
            TelemetryEventKind::LightOff,
            TelemetryEventKind::MotionDetected,
            TelemetryEventKind::ObjectNear,
            TelemetryEventKind::ObjectCleared,
            TelemetryEventKind::WarmupComplete,
        ];
        for event in fixtures {
            assert_eq!(TelemetryEventKind::from_raw(event.to_raw()), event);
        }
        assert_eq!(
            TelemetryEventKind::from_raw(0x7777),
            TelemetryEventKind::Custom(0x7777)
        );
    }

    #[test]
    fn light_changes_track_previous_duration() {
        let mut recorder = TelemetryRecorder::<8>::new();

        let first = recorder.record_light_change(true, Millis::new(1_000));
        assert_eq!(first, 0);
        let record = recorder.latest().copied().unwrap();
        assert_eq!(record.event, TelemetryEventKind::LightOn);
        assert_eq!(
            record.details,
            TelemetryPayload::Light(LightTelemetry { previous_for: None })
        );

        let second = recorder.record_light_change(false, Millis::new(91_000));
        assert_eq!(second, 1);
        let record = recorder.latest().copied().unwrap();
        assert_eq!(record.event, TelemetryEventKind::LightOff);
        assert_eq!(
            record.details,
            TelemetryPayload::Light(LightTelemetry {
                previous_for: Some(Millis::new(90_000))
            })
        );
    }

    #[test]
    fn ring_keeps_most_recent_records() {
        let mut recorder = TelemetryRecorder::<4>::new();
        for tick in 0..6u32 {
            recorder.record_event(TelemetryEventKind::MotionDetected, Millis::new(tick));
        }

        assert_eq!(recorder.len(), 4);
        assert_eq!(recorder.next_id(), 6);
        let ids: [EventId; 4] = {
            let mut ids = [0; 4];
            for (slot, record) in ids.iter_mut().zip(recorder.oldest_first()) {
                *slot = record.id;
            }
            ids
        };
        assert_eq!(ids, [2, 3, 4, 5]);
    }
}
