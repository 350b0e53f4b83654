use std::io;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, SessionOptions};

const TRANSCRIPT_DIR: &str = "transcripts";

fn main() -> io::Result<()> {
    record("presence-hold.log", &[
        "motion on",
        "run 500ms",
        "motion off",
        "run 89s",
        "status",
        "run 1s",
        "status",
    ])?;
    record("presence-ranging.log", &[
        "object 40",
        "run 1s",
        "object 12",
        "run 1s",
        "clear",
        "run 1s",
        "status",
    ])?;
    record("presence-unplugged.log", &[
        "unplug",
        "object 6",
        "run 1s",
        "status",
        "motion on",
        "run 10ms",
        "plug",
        "status",
    ])?;
    Ok(())
}

fn record(name: &str, script: &[&str]) -> io::Result<()> {
    let mut session = Session::new(SessionOptions {
        skip_warmup: true,
        transcript: Some(PathBuf::from(TRANSCRIPT_DIR).join(name)),
        ..SessionOptions::default()
    })?;
    for command in script {
        let _ = session.handle_command(command)?;
    }
    Ok(())
}
