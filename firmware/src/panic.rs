//! Panic handler for the lamp controller.
//!
//! The lamp runs unattended, so a panic logs over RTT and resets the MCU.
//! The light output pin returns to its reset state (low) until the control
//! loop comes back up.

use core::panic::PanicInfo;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    defmt::error!("presence-lamp panic: {}", defmt::Display2Format(info));
    cortex_m::peripheral::SCB::sys_reset();
}
