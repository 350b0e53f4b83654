use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use presence_core::clock::{Micros, Millis, TickInstant};
use presence_core::config::{PresenceConfig, parse_distance, parse_interval};
use presence_core::control::{
    DEFAULT_TICK_PERIOD, PresenceController, PresenceOutputs, SensorLevels,
};
use presence_core::motion::MotionSensor;
use presence_core::ranging::{PingTrigger, RangeState};
use presence_core::telemetry::{
    EventId, LightTelemetry, TelemetryPayload, TelemetryRecord, TelemetryRecorder,
};

#[allow(clippy::cast_possible_truncation)]
const TICK_MICROS: u64 = DEFAULT_TICK_PERIOD.as_micros() as u64;

/// Delay between the end of a trigger pulse and the echo rising.
pub const ECHO_LATENCY_MICROS: u64 = 450;

/// Echo width reported when nothing reflects the ping.
pub const ECHO_TIMEOUT_MICROS: u64 = 38_000;

/// Longest span a single `run` command may simulate.
pub const MAX_RUN: Duration = Duration::from_secs(3_600);

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "motion",
        "motion on|off                - drive the motion sensor input",
    ),
    (
        "object",
        "object <inches>              - place a reflector in front of the range finder",
    ),
    (
        "clear",
        "clear                        - remove the reflector (echo times out)",
    ),
    (
        "unplug",
        "unplug                       - disconnect the echo line",
    ),
    (
        "plug",
        "plug                         - reconnect the echo line",
    ),
    (
        "run",
        "run <duration>               - advance simulated time (e.g. 90s, 250ms)",
    ),
    (
        "status",
        "status                       - display controller and sensor state",
    ),
    (
        "help",
        "help [topic]                 - show help for a command",
    ),
];

/// Start-up options shared by the console and the transcript recorder.
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub config: PresenceConfig,
    pub skip_warmup: bool,
    pub transcript: Option<PathBuf>,
}

pub struct Session {
    config: PresenceConfig,
    controller: PresenceController,
    bench: SimulatedBench,
    motion: bool,
    telemetry: TelemetryRecorder,
    next_unreported: EventId,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        let SessionOptions {
            config,
            skip_warmup,
            transcript,
        } = options;

        let controller = if skip_warmup {
            PresenceController::with_motion_sensor(&config, Millis::ZERO, MotionSensor::ready())
        } else {
            PresenceController::new(&config, Millis::ZERO)
        };
        let transcript = transcript
            .map(|path| TranscriptLogger::create(&path, &config))
            .transpose()?;

        Ok(Self {
            config,
            controller,
            bench: SimulatedBench::new(),
            motion: false,
            telemetry: TelemetryRecorder::new(),
            next_unreported: 0,
            transcript,
        })
    }

    pub fn describe_config(&self) -> String {
        describe_config(&self.config)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let stamp = self.bench.now_us;
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(stamp, TranscriptRole::Host, trimmed)?;
        }

        let mut words = trimmed.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let argument = words.next();
        let extra = words.next();

        let lines = match (command.as_str(), argument, extra) {
            (_, _, Some(unexpected)) => vec![format!("ERR unexpected argument `{unexpected}`")],
            ("help", topic, None) => help(topic),
            ("motion", Some(level), None) => self.set_motion(level),
            ("object", Some(distance), None) => self.place_object(distance),
            ("clear", None, None) => {
                self.bench.object = None;
                vec!["OK object cleared".to_string()]
            }
            ("unplug", None, None) => {
                self.bench.connected = false;
                vec!["OK echo disconnected".to_string()]
            }
            ("plug", None, None) => {
                self.bench.connected = true;
                vec!["OK echo connected".to_string()]
            }
            ("run", Some(duration), None) => self.run_for(duration),
            ("status", None, None) => vec![self.status()],
            ("motion" | "object" | "run", None, None) => {
                vec![format!("ERR usage {}", usage(&command))]
            }
            ("clear" | "unplug" | "plug" | "status", Some(unexpected), None) => {
                vec![format!("ERR unexpected argument `{unexpected}`")]
            }
            (other, _, None) => vec![format!(
                "ERR unknown command `{other}`; type `help` for commands"
            )],
        };

        if let Some(transcript) = self.transcript.as_mut() {
            for line in &lines {
                transcript.append_line(stamp, TranscriptRole::Emulator, line)?;
            }
        }
        Ok(lines)
    }

    /// Simulated time since the session started.
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.bench.now_us)
    }

    pub fn light_on(&self) -> bool {
        self.bench.light
    }

    fn set_motion(&mut self, level: &str) -> Vec<String> {
        if level.eq_ignore_ascii_case("on") {
            self.motion = true;
        } else if level.eq_ignore_ascii_case("off") {
            self.motion = false;
        } else {
            return vec![format!("ERR usage {}", usage("motion"))];
        }
        vec![format!("OK motion {}", on_off(self.motion))]
    }

    fn place_object(&mut self, distance: &str) -> Vec<String> {
        match parse_distance(distance) {
            Some(0) => vec!["ERR object distance must be greater than zero".to_string()],
            Some(inches) => {
                self.bench.object = Some(inches);
                vec![format!("OK object at {inches}in")]
            }
            None => vec![format!("ERR invalid distance `{distance}`")],
        }
    }

    fn run_for(&mut self, duration: &str) -> Vec<String> {
        let Some(span) = parse_interval(duration) else {
            return vec![format!("ERR invalid duration `{duration}`")];
        };
        if span.is_zero() {
            return vec!["ERR run duration must be greater than zero".to_string()];
        }
        if span > MAX_RUN {
            return vec![format!(
                "ERR run duration exceeds {}",
                format_micros(duration_micros(MAX_RUN))
            )];
        }

        let end = self.bench.now_us.saturating_add(duration_micros(span));
        while self.bench.now_us < end {
            self.step();
        }

        let mut lines = vec![format!(
            "OK ran {} now=+{} light={}",
            format_micros(duration_micros(span)),
            format_micros(self.bench.now_us),
            on_off(self.bench.light)
        )];
        self.report_telemetry(&mut lines);
        lines
    }

    fn step(&mut self) {
        let now = tick_instant(self.bench.now_us);
        let levels = SensorLevels {
            motion: self.motion,
            echo: self.bench.echo_level(),
        };
        self.controller
            .tick_with_telemetry(now, levels, &mut self.bench, &mut self.telemetry);
        self.bench.now_us += TICK_MICROS;
    }

    fn report_telemetry(&mut self, lines: &mut Vec<String>) {
        let produced = self.telemetry.next_id().wrapping_sub(self.next_unreported);
        let mut shown = 0;
        for record in self.telemetry.oldest_first() {
            if record.id.wrapping_sub(self.next_unreported) < produced {
                lines.push(describe_record(record));
                shown += 1;
            }
        }
        if produced > shown {
            lines.push(format!(
                "  ({} earlier events overwritten)",
                produced - shown
            ));
        }
        self.next_unreported = self.telemetry.next_id();
    }

    fn status(&self) -> String {
        let object = match (self.bench.connected, self.bench.object) {
            (false, _) => "unplugged".to_string(),
            (true, Some(inches)) => format!("{inches}in"),
            (true, None) => "clear".to_string(),
        };
        let warmup = if self.controller.motion().is_warmed_up() {
            "complete"
        } else {
            "pending"
        };
        let mut status = format!(
            "OK status t=+{} light={} motion={} object={object} ranging={} near={} warmup={warmup} last-detection=+{}ms",
            format_micros(self.bench.now_us),
            on_off(self.bench.light),
            on_off(self.motion),
            range_label(self.controller.ranging().state()),
            on_off(self.controller.object_near()),
            self.controller.hold().last_detection().ticks(),
        );
        if self.config.debug_enabled {
            status.push_str(" indicator=");
            status.push_str(on_off(self.bench.indicator));
        }
        status
    }
}

/// Light, indicator and ultrasonic module as seen by the controller.
struct SimulatedBench {
    now_us: u64,
    light: bool,
    indicator: bool,
    object: Option<u16>,
    connected: bool,
    echo_from: Option<u64>,
}

impl SimulatedBench {
    fn new() -> Self {
        Self {
            now_us: 0,
            light: false,
            indicator: false,
            object: None,
            connected: true,
            echo_from: None,
        }
    }

    fn echo_width(&self) -> u64 {
        self.object.map_or(ECHO_TIMEOUT_MICROS, |inches| {
            (2 * 74 * u64::from(inches)).min(ECHO_TIMEOUT_MICROS)
        })
    }

    /// Level of the echo line at the current simulated time.
    fn echo_level(&mut self) -> bool {
        let Some(rise) = self.echo_from else {
            return false;
        };
        let fall = rise + self.echo_width();
        if self.now_us >= fall {
            self.echo_from = None;
            return false;
        }
        self.connected && self.now_us >= rise
    }
}

impl PingTrigger for SimulatedBench {
    fn pulse(&mut self, width: Micros) {
        let trailing_edge = self.now_us + u64::from(width.ticks());
        self.echo_from = Some(trailing_edge + ECHO_LATENCY_MICROS);
    }
}

impl PresenceOutputs for SimulatedBench {
    fn set_light(&mut self, on: bool) {
        self.light = on;
    }

    fn set_indicator(&mut self, on: bool) {
        self.indicator = on;
    }
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn create(path: &Path, config: &PresenceConfig) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header(config)?;
        Ok(logger)
    }

    fn write_header(&mut self, config: &PresenceConfig) -> io::Result<()> {
        writeln!(self.writer, "# Presence Lamp Emulator transcript")?;
        writeln!(self.writer, "# {}", describe_config(config))?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, now_us: u64, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>9} ms] {} {}",
            now_us / 1_000,
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

/// Splits the simulated clock into the two wrapping counters.
#[allow(clippy::cast_possible_truncation)]
fn tick_instant(now_us: u64) -> TickInstant {
    TickInstant::new(
        Millis::new((now_us / 1_000) as u32),
        Micros::new(now_us as u32),
    )
}

fn duration_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn help(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("  exit|quit                    - close the session".to_string());
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Syntax half of a help line, without the description.
fn usage(command: &str) -> &'static str {
    HELP_TOPICS
        .iter()
        .find(|(name, _)| *name == command)
        .map_or("", |&(_, detail)| {
            detail
                .split_once(" - ")
                .map_or(detail, |(syntax, _)| syntax)
                .trim_end()
        })
}

fn describe_config(config: &PresenceConfig) -> String {
    format!(
        "hold={} distance={}in warmup={} pulse={}us debug={}",
        format_micros(duration_micros(config.hold_interval)),
        config.distance_threshold_inches,
        format_micros(duration_micros(config.warmup)),
        config.trigger_pulse_micros().ticks(),
        on_off(config.debug_enabled)
    )
}

fn describe_record(record: &TelemetryRecord) -> String {
    let at = format_micros(u64::from(record.timestamp.ticks()) * 1_000);
    match record.details {
        TelemetryPayload::Light(LightTelemetry {
            previous_for: Some(previous),
        }) => format!(
            "  +{at} {} (previous state {})",
            record.event,
            format_micros(u64::from(previous.ticks()) * 1_000)
        ),
        _ => format!("  +{at} {}", record.event),
    }
}

fn range_label(state: RangeState) -> &'static str {
    match state {
        RangeState::Idle => "idle",
        RangeState::WaitingForEcho => "waiting-for-echo",
        RangeState::MeasuringEcho { .. } => "measuring-echo",
    }
}

fn on_off(level: bool) -> &'static str {
    if level { "on" } else { "off" }
}

fn format_micros(micros: u64) -> String {
    let millis = micros / 1_000;
    format!("{}.{:03}s", millis / 1_000, millis % 1_000)
}
