#![no_std]

// Shared presence-lamp logic.
//
// Everything here is target-agnostic so the firmware and the host emulator
// drive the same hold, motion, and ranging state machines.

pub mod clock;
pub mod config;
pub mod control;
pub mod hold;
pub mod motion;
pub mod ranging;
pub mod telemetry;
