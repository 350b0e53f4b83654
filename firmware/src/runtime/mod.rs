//! Executor entry point: claims the pins and starts the control task.

use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};

use crate::config;
use crate::hw::{HardwareOutputs, SensorInputs};
use crate::telemetry;

mod control_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let hal::Peripherals {
        PA0,
        PA1,
        PA5,
        PA6,
        PA7,
        ..
    } = hal::init(hal::Config::default());

    let outputs = HardwareOutputs::new(
        Output::new(PA0, Level::Low, Speed::Low),
        Output::new(PA5, Level::Low, Speed::Low),
        Output::new(PA6, Level::Low, Speed::VeryHigh),
    );
    let inputs = SensorInputs::new(Input::new(PA1, Pull::Down), Input::new(PA7, Pull::Down));

    let (presence_config, config_error) = config::load();
    if let Some(error) = &config_error {
        telemetry::log_config_error(error);
    }
    telemetry::log_boot(&presence_config);

    spawner
        .spawn(control_task::run(outputs, inputs, presence_config))
        .expect("failed to spawn presence control task");

    core::future::pending::<()>().await;
}
