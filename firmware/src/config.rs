#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Build-time configuration for the firmware image.
//!
//! Options use the same `key=value` syntax as the emulator and are taken
//! from the `PRESENCE_CONFIG` environment variable when the image is built,
//! for example `PRESENCE_CONFIG="hold=120s distance=30" cargo build`.
//! The `debug-indicator` Cargo feature turns on the indicator mirror
//! regardless of the option string.

use core::time::Duration;

use presence_core::config::{ConfigError, PresenceConfig};
use presence_core::control::DEFAULT_TICK_PERIOD;

/// Option string baked into the image, if any.
pub const BUILD_OPTIONS: Option<&str> = option_env!("PRESENCE_CONFIG");

/// Control-loop period used by the firmware ticker.
pub const TICK_PERIOD: Duration = DEFAULT_TICK_PERIOD;

/// Resolves the configuration used at boot.
///
/// A malformed option string falls back to the defaults; the error is
/// returned alongside so the caller can log it.
pub fn load() -> (PresenceConfig, Option<ConfigError<'static>>) {
    let (mut config, error) = match BUILD_OPTIONS {
        Some(options) => match PresenceConfig::parse(options) {
            Ok(config) => (config, None),
            Err(error) => (PresenceConfig::DEFAULT, Some(error)),
        },
        None => (PresenceConfig::DEFAULT, None),
    };

    if cfg!(feature = "debug-indicator") {
        config.debug_enabled = true;
    }

    (config, error)
}
