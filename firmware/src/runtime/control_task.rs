use embassy_time::{Duration, Ticker};

use presence_core::clock::MonotonicClock;
use presence_core::config::PresenceConfig;
use presence_core::control::{ControlLoopContract, PresenceController};

use crate::config::TICK_PERIOD;
use crate::hw::{EmbassyClock, HardwareOutputs, SensorInputs};
use crate::telemetry::{self, TelemetryLog};

/// Fixed-rate control loop.
///
/// One tick samples both counters and both inputs, then runs a single
/// synchronous controller pass. Telemetry is logged after the pass so the
/// defmt write never sits between sampling and driving the outputs.
#[embassy_executor::task]
pub async fn run(
    mut outputs: HardwareOutputs<'static>,
    inputs: SensorInputs<'static>,
    config: PresenceConfig,
) -> ! {
    let contract = ControlLoopContract::new(TICK_PERIOD, &config);
    if let Err(violation) = contract.check() {
        telemetry::log_contract_violation(&violation);
    }

    let clock = EmbassyClock;
    let mut controller = PresenceController::new(&config, clock.now_millis());
    let mut log = TelemetryLog::new();
    let period = Duration::from_micros(u64::from(contract.tick_period.ticks()));
    let mut ticker = Ticker::every(period);

    loop {
        let now = clock.sample();
        let levels = inputs.sample();
        controller.tick_with_telemetry(now, levels, &mut outputs, log.recorder_mut());
        if log.has_pending() {
            log.flush();
        }
        ticker.next().await;
    }
}
