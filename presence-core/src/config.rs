//! Controller configuration and its option-string parser.
//!
//! Options are written as `key=value` assignments separated by whitespace or
//! commas, for example `hold=120s distance=30 debug=on`. Keys are
//! case-insensitive. Durations accept a `us`, `ms`, or `s` suffix; a bare
//! number uses the unit listed for the key.
//!
//! | key        | unit (bare) | default  |
//! |------------|-------------|----------|
//! | `hold`     | s           | 90 s     |
//! | `distance` | inches      | 24       |
//! | `warmup`   | ms          | 60000 ms |
//! | `pulse`    | us          | 10 us    |
//! | `debug`    | on/off      | off      |
//!
//! [`PresenceConfig::parse`] validates the result. Configurations built
//! directly in code skip validation, and a zero hold interval or distance
//! then simply never turns the light on from that source.

use core::fmt;
use core::ops::Range;
use core::time::Duration;

use winnow::ascii::{dec_uint, space0};
use winnow::combinator::{alt, opt, separated_pair};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

use crate::clock::{Micros, Millis};
use crate::ranging::echo_threshold;

pub const DEFAULT_HOLD_INTERVAL: Duration = Duration::from_secs(90);
pub const DEFAULT_DISTANCE_THRESHOLD_INCHES: u16 = 24;
pub const DEFAULT_WARMUP: Duration = Duration::from_millis(60_000);
pub const DEFAULT_TRIGGER_PULSE_WIDTH: Duration = Duration::from_micros(10);

/// Tunables for the presence controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PresenceConfig {
    /// How long the light stays on after the most recent detection.
    pub hold_interval: Duration,
    /// Objects nearer than this count as a ranging detection.
    pub distance_threshold_inches: u16,
    /// Motion-sensor readings are ignored until the clock passes this.
    pub warmup: Duration,
    pub trigger_pulse_width: Duration,
    /// Mirror the fused detection onto the indicator output.
    pub debug_enabled: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PresenceConfig {
    pub const DEFAULT: Self = Self {
        hold_interval: DEFAULT_HOLD_INTERVAL,
        distance_threshold_inches: DEFAULT_DISTANCE_THRESHOLD_INCHES,
        warmup: DEFAULT_WARMUP,
        trigger_pulse_width: DEFAULT_TRIGGER_PULSE_WIDTH,
        debug_enabled: false,
    };

    /// Parses an option string on top of the defaults and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed assignments, unknown keys,
    /// unparsable values, or values rejected by [`validate`](Self::validate).
    pub fn parse(line: &str) -> Result<Self, ConfigError<'_>> {
        let mut config = Self::DEFAULT;
        config.apply(line)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies every assignment in `line` to `self` without validating.
    ///
    /// # Errors
    ///
    /// Stops at the first malformed assignment, unknown key, or bad value.
    /// Assignments before the failing one have already been applied.
    pub fn apply<'a>(&mut self, line: &'a str) -> Result<(), ConfigError<'a>> {
        let mut input = line;
        loop {
            // Separator runs cannot fail.
            let _ = separators.parse_next(&mut input);
            if input.is_empty() {
                return Ok(());
            }

            let start = line.len() - input.len();
            let checkpoint = input;
            let Ok((key, value)) = assignment.parse_next(&mut input) else {
                let end = start + checkpoint.find(is_separator).unwrap_or(checkpoint.len());
                return Err(ConfigError::Syntax {
                    fragment: &line[start..end],
                    span: start..end,
                });
            };
            let span = start..line.len() - input.len();
            self.assign(key, value, span)?;
        }
    }

    fn assign<'a>(
        &mut self,
        key: &'a str,
        value: &'a str,
        span: Range<usize>,
    ) -> Result<(), ConfigError<'a>> {
        let Some(option) = ConfigKey::from_name(key) else {
            return Err(ConfigError::UnknownKey { key, span });
        };
        let invalid = || ConfigError::InvalidValue {
            key: option,
            value,
            span: span.clone(),
        };

        match option {
            ConfigKey::Hold => {
                self.hold_interval = parse_duration(value, TimeUnit::Seconds).ok_or_else(invalid)?;
            }
            ConfigKey::Distance => {
                self.distance_threshold_inches = parse_inches(value).ok_or_else(invalid)?;
            }
            ConfigKey::Warmup => {
                self.warmup = parse_duration(value, TimeUnit::Millis).ok_or_else(invalid)?;
            }
            ConfigKey::Pulse => {
                self.trigger_pulse_width =
                    parse_duration(value, TimeUnit::Micros).ok_or_else(invalid)?;
            }
            ConfigKey::Debug => {
                self.debug_enabled = parse_switch(value).ok_or_else(invalid)?;
            }
        }
        Ok(())
    }

    /// Rejects values that would leave a detection source permanently inert
    /// or that do not fit the wrapping 32-bit counters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the first offending key.
    pub fn validate<'a>(&self) -> Result<(), ConfigError<'a>> {
        if !fits_counter(self.hold_interval.as_millis(), 1) {
            return Err(ConfigError::OutOfRange {
                key: ConfigKey::Hold,
            });
        }
        if self.distance_threshold_inches == 0 {
            return Err(ConfigError::OutOfRange {
                key: ConfigKey::Distance,
            });
        }
        if !fits_counter(self.warmup.as_millis(), 0) {
            return Err(ConfigError::OutOfRange {
                key: ConfigKey::Warmup,
            });
        }
        if !fits_counter(self.trigger_pulse_width.as_micros(), 1) {
            return Err(ConfigError::OutOfRange {
                key: ConfigKey::Pulse,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn hold_interval_millis(&self) -> Millis {
        Millis::from_duration(self.hold_interval)
    }

    #[must_use]
    pub fn warmup_millis(&self) -> Millis {
        Millis::from_duration(self.warmup)
    }

    #[must_use]
    pub fn trigger_pulse_micros(&self) -> Micros {
        Micros::from_duration(self.trigger_pulse_width)
    }

    /// Echo width below which the range finder reports a detection.
    #[must_use]
    pub const fn range_threshold(&self) -> Micros {
        echo_threshold(self.distance_threshold_inches)
    }
}

/// Recognized option keys.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigKey {
    Hold,
    Distance,
    Warmup,
    Pulse,
    Debug,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::Hold,
        ConfigKey::Distance,
        ConfigKey::Warmup,
        ConfigKey::Pulse,
        ConfigKey::Debug,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Hold => "hold",
            ConfigKey::Distance => "distance",
            ConfigKey::Warmup => "warmup",
            ConfigKey::Pulse => "pulse",
            ConfigKey::Debug => "debug",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported while loading a configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError<'a> {
    /// Text that is not a `key=value` assignment.
    Syntax {
        fragment: &'a str,
        span: Range<usize>,
    },
    UnknownKey {
        key: &'a str,
        span: Range<usize>,
    },
    InvalidValue {
        key: ConfigKey,
        value: &'a str,
        span: Range<usize>,
    },
    /// Value parsed but was rejected by validation.
    OutOfRange { key: ConfigKey },
}

impl ConfigError<'_> {
    /// Byte span of the offending assignment, when one is known.
    #[must_use]
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            ConfigError::Syntax { span, .. }
            | ConfigError::UnknownKey { span, .. }
            | ConfigError::InvalidValue { span, .. } => Some(span.clone()),
            ConfigError::OutOfRange { .. } => None,
        }
    }
}

impl fmt::Display for ConfigError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Syntax { fragment, span } => {
                write!(f, "expected key=value, found `{fragment}` at {span:?}")
            }
            ConfigError::UnknownKey { key, span } => {
                write!(f, "unknown option `{key}` at {span:?}")
            }
            ConfigError::InvalidValue { key, value, span } => {
                write!(f, "invalid value `{value}` for {key} at {span:?}")
            }
            ConfigError::OutOfRange { key } => {
                write!(f, "{key} is outside the supported range")
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum TimeUnit {
    Micros,
    Millis,
    Seconds,
}

impl TimeUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "us" => Some(TimeUnit::Micros),
            "ms" => Some(TimeUnit::Millis),
            "s" => Some(TimeUnit::Seconds),
            _ => None,
        }
    }

    const fn duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Micros => Duration::from_micros(amount),
            TimeUnit::Millis => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
        }
    }
}

fn fits_counter(ticks: u128, min: u128) -> bool {
    (min..=u128::from(u32::MAX)).contains(&ticks)
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

fn separators<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(0.., is_separator).parse_next(input)
}

fn key_name<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_').parse_next(input)
}

fn value_text<'s>(input: &mut &'s str) -> winnow::Result<&'s str> {
    take_while(1.., |c: char| !is_separator(c)).parse_next(input)
}

fn assignment<'s>(input: &mut &'s str) -> winnow::Result<(&'s str, &'s str)> {
    separated_pair(key_name, (space0, '=', space0), value_text).parse_next(input)
}

/// Parses a duration such as `90`, `90s`, `1500ms` or `10us`; bare numbers
/// are seconds.
#[must_use]
pub fn parse_interval(value: &str) -> Option<Duration> {
    parse_duration(value, TimeUnit::Seconds)
}

/// Parses a distance such as `24` or `24in`.
#[must_use]
pub fn parse_distance(value: &str) -> Option<u16> {
    parse_inches(value)
}

fn parse_duration(value: &str, default_unit: TimeUnit) -> Option<Duration> {
    let (amount, suffix) = (
        dec_uint::<_, u64, ContextError>,
        opt(alt(("us", "ms", "s"))),
    )
        .parse(value)
        .ok()?;
    let unit = match suffix {
        Some(suffix) => TimeUnit::from_suffix(suffix)?,
        None => default_unit,
    };
    Some(unit.duration(amount))
}

fn parse_inches(value: &str) -> Option<u16> {
    let (inches, _) = (dec_uint::<_, u16, ContextError>, opt("in"))
        .parse(value)
        .ok()?;
    Some(inches)
}

fn parse_switch(value: &str) -> Option<bool> {
    const ON: [&str; 3] = ["on", "true", "1"];
    const OFF: [&str; 3] = ["off", "false", "0"];

    if ON.iter().any(|word| word.eq_ignore_ascii_case(value)) {
        Some(true)
    } else if OFF.iter().any(|word| word.eq_ignore_ascii_case(value)) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_yields_defaults() {
        assert_eq!(PresenceConfig::parse(""), Ok(PresenceConfig::DEFAULT));
        assert_eq!(PresenceConfig::parse(" ,  "), Ok(PresenceConfig::DEFAULT));
    }

    #[test]
    fn parses_every_option() {
        let config =
            PresenceConfig::parse("hold=120 distance=30in, warmup=5s pulse=12us DEBUG=on")
                .expect("valid options");

        assert_eq!(config.hold_interval, Duration::from_secs(120));
        assert_eq!(config.distance_threshold_inches, 30);
        assert_eq!(config.warmup, Duration::from_secs(5));
        assert_eq!(config.trigger_pulse_width, Duration::from_micros(12));
        assert!(config.debug_enabled);
    }

    #[test]
    fn bare_numbers_use_key_units() {
        let config = PresenceConfig::parse("hold=45 warmup=1500 pulse=20").expect("valid options");
        assert_eq!(config.hold_interval_millis(), Millis::new(45_000));
        assert_eq!(config.warmup_millis(), Millis::new(1_500));
        assert_eq!(config.trigger_pulse_micros(), Micros::new(20));
    }

    #[test]
    fn tolerates_spaces_around_equals() {
        let config = PresenceConfig::parse("hold = 2500ms").expect("valid options");
        assert_eq!(config.hold_interval, Duration::from_millis(2_500));
    }

    #[test]
    fn reports_unknown_key_span() {
        let err = PresenceConfig::parse("hold=10 colour=red").unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownKey {
                key: "colour",
                span: 8..18,
            }
        );
    }

    #[test]
    fn reports_bad_value() {
        let err = PresenceConfig::parse("distance=far").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ConfigKey::Distance,
                value: "far",
                ..
            }
        ));

        let err = PresenceConfig::parse("hold=10min").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ConfigKey::Hold, .. }));

        let err = PresenceConfig::parse("debug=maybe").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ConfigKey::Debug, .. }));
    }

    #[test]
    fn reports_syntax_errors() {
        let err = PresenceConfig::parse("hold=5 =7").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Syntax {
                fragment: "=7",
                span: 7..9,
            }
        );

        let err = PresenceConfig::parse("debug").unwrap_err();
        assert_eq!(err.span(), Some(0..5));
    }

    #[test]
    fn validation_rejects_zero_values() {
        assert_eq!(
            PresenceConfig::parse("hold=0"),
            Err(ConfigError::OutOfRange {
                key: ConfigKey::Hold
            })
        );
        assert_eq!(
            PresenceConfig::parse("distance=0"),
            Err(ConfigError::OutOfRange {
                key: ConfigKey::Distance
            })
        );
        assert_eq!(
            PresenceConfig::parse("pulse=0us"),
            Err(ConfigError::OutOfRange {
                key: ConfigKey::Pulse
            })
        );
    }

    #[test]
    fn validation_rejects_counter_overflow() {
        assert_eq!(
            PresenceConfig::parse("hold=5000000"),
            Err(ConfigError::OutOfRange {
                key: ConfigKey::Hold
            })
        );
        assert_eq!(
            PresenceConfig::parse("warmup=5000000s"),
            Err(ConfigError::OutOfRange {
                key: ConfigKey::Warmup
            })
        );
        assert_eq!(
            PresenceConfig::parse("pulse=5000s"),
            Err(ConfigError::OutOfRange {
                key: ConfigKey::Pulse
            })
        );
        assert!(PresenceConfig::parse("hold=4000000 warmup=0").is_ok());
    }

    #[test]
    fn overflowing_values_are_invalid() {
        let err = PresenceConfig::parse("distance=70000").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ConfigKey::Distance, .. }));
    }

    #[test]
    fn standalone_value_parsers() {
        assert_eq!(parse_interval("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_interval("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_interval("soon"), None);
        assert_eq!(parse_distance("12in"), Some(12));
        assert_eq!(parse_distance("12ft"), None);
    }

    #[test]
    fn range_threshold_follows_distance() {
        let config = PresenceConfig::DEFAULT;
        assert_eq!(config.range_threshold(), Micros::new(3_552));
    }
}
