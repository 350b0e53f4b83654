#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Telemetry ring plus defmt / console mirroring.
//!
//! The control task records into the shared `presence-core` ring every tick.
//! [`TelemetryLog::flush`] then mirrors records that have not been logged yet,
//! so logging stays outside the tick itself and never sees a record twice.

use presence_core::clock::Millis;
use presence_core::config::{ConfigError, PresenceConfig};
use presence_core::control::ContractViolation;
use presence_core::telemetry::{
    EventId, LightTelemetry, TelemetryPayload, TelemetryRecord, TelemetryRecorder,
};

/// Wraps the telemetry ring and remembers how far it has been logged.
pub struct TelemetryLog {
    recorder: TelemetryRecorder,
    next_unlogged: EventId,
}

impl TelemetryLog {
    pub const fn new() -> Self {
        Self {
            recorder: TelemetryRecorder::new(),
            next_unlogged: 0,
        }
    }

    pub fn recorder_mut(&mut self) -> &mut TelemetryRecorder {
        &mut self.recorder
    }

    pub fn recorder(&self) -> &TelemetryRecorder {
        &self.recorder
    }

    /// Returns `true` when records have been written since the last flush.
    pub fn has_pending(&self) -> bool {
        self.recorder.next_id() != self.next_unlogged
    }

    /// Logs every record written since the previous flush.
    ///
    /// Records overwritten before a flush are skipped silently.
    pub fn flush(&mut self) -> usize {
        let mut logged = 0;
        for record in self.recorder.oldest_first() {
            if is_pending(record.id, self.next_unlogged) {
                log_record(record);
                logged += 1;
            }
        }
        self.next_unlogged = self.recorder.next_id();
        logged
    }
}

/// `true` when `id` is at or after `cursor` on the wrapping id ring.
fn is_pending(id: EventId, cursor: EventId) -> bool {
    id.wrapping_sub(cursor) < EventId::MAX / 2
}

fn light_previous_ms(record: &TelemetryRecord) -> Option<u32> {
    match record.details {
        TelemetryPayload::Light(LightTelemetry { previous_for }) => {
            previous_for.map(Millis::ticks)
        }
        TelemetryPayload::None => None,
    }
}

#[cfg(target_os = "none")]
fn log_record(record: &TelemetryRecord) {
    match light_previous_ms(record) {
        Some(previous) => defmt::info!(
            "telemetry#{} {} t={}ms (previous state {}ms)",
            record.id,
            defmt::Display2Format(&record.event),
            record.timestamp.ticks(),
            previous
        ),
        None => defmt::info!(
            "telemetry#{} {} t={}ms",
            record.id,
            defmt::Display2Format(&record.event),
            record.timestamp.ticks()
        ),
    }
}

#[cfg(not(target_os = "none"))]
fn log_record(record: &TelemetryRecord) {
    match light_previous_ms(record) {
        Some(previous) => println!(
            "telemetry#{} {} t={}ms (previous state {}ms)",
            record.id,
            record.event,
            record.timestamp.ticks(),
            previous
        ),
        None => println!(
            "telemetry#{} {} t={}ms",
            record.id,
            record.event,
            record.timestamp.ticks()
        ),
    }
}

#[cfg(target_os = "none")]
pub fn log_boot(config: &PresenceConfig) {
    defmt::info!(
        "presence: hold={}ms distance={}in warmup={}ms pulse={}us debug={}",
        config.hold_interval_millis().ticks(),
        config.distance_threshold_inches,
        config.warmup_millis().ticks(),
        config.trigger_pulse_micros().ticks(),
        config.debug_enabled
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_boot(config: &PresenceConfig) {
    println!(
        "presence: hold={}ms distance={}in warmup={}ms pulse={}us debug={}",
        config.hold_interval_millis().ticks(),
        config.distance_threshold_inches,
        config.warmup_millis().ticks(),
        config.trigger_pulse_micros().ticks(),
        config.debug_enabled
    );
}

#[cfg(target_os = "none")]
pub fn log_config_error(error: &ConfigError<'_>) {
    defmt::warn!(
        "presence: PRESENCE_CONFIG rejected ({}), using defaults",
        defmt::Display2Format(error)
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_config_error(error: &ConfigError<'_>) {
    println!("presence: PRESENCE_CONFIG rejected ({error}), using defaults");
}

#[cfg(target_os = "none")]
pub fn log_contract_violation(violation: &ContractViolation) {
    defmt::warn!(
        "presence: control loop timing contract not met: {}",
        defmt::Display2Format(violation)
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_contract_violation(violation: &ContractViolation) {
    println!("presence: control loop timing contract not met: {violation}");
}
