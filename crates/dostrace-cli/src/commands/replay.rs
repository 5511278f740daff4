//! Replay command - Drive a trace session from a recorded event script.
//!
//! Scripts hold one JSON [`TraceEvent`] per line. Blank lines and lines
//! starting with `#` are skipped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use dostrace::prelude::*;
use dostrace::SessionSummary;

use crate::OutputFormat;

/// Arguments for the replay command.
#[derive(Args)]
pub struct ReplayArgs {
    /// Path to the event script (JSON lines)
    #[arg(required = true)]
    pub script: PathBuf,

    /// Trace log destination ('stdout' for the console), overriding logfile
    #[arg(short, long)]
    pub log: Option<String>,

    /// Start tracing immediately instead of at the first program load
    #[arg(long)]
    pub eager: bool,

    /// Only start tracing for programs launched from the interactive prompt
    #[arg(long)]
    pub interactive_only: bool,
}

/// Replay result.
#[derive(Debug, Serialize)]
struct ReplayReport {
    script: String,
    events: usize,
    host_events: usize,
    /// Session state after the last event, before shutdown.
    session: SessionSummary,
    /// Lines written including the closing banner.
    lines_written: u64,
}

/// Parse an event script.
///
/// Returns each event with its 1-based line number.
pub fn parse_script(source: &str) -> Result<Vec<(usize, TraceEvent)>> {
    let mut events = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(line)
            .with_context(|| format!("Invalid event on line {}", index + 1))?;
        events.push((index + 1, event));
    }
    Ok(events)
}

fn load_config(path: Option<&Path>, args: &ReplayArgs) -> Result<TraceConfig> {
    let mut config = match path {
        Some(path) => TraceConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => TraceConfig::default(),
    };

    config.enabled = true;
    if let Some(log) = &args.log {
        config.logfile = log.clone();
    }
    if args.eager {
        config.auto_trace_on_exec = false;
    }
    if args.interactive_only {
        config.interactive_only = true;
    }
    Ok(config)
}

/// Execute the replay command.
pub fn execute(
    args: ReplayArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let config = load_config(config_path, &args)?;

    let source = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script: {}", args.script.display()))?;
    let events = parse_script(&source)
        .with_context(|| format!("Failed to parse script: {}", args.script.display()))?;

    tracing::info!(
        script = %args.script.display(),
        events = events.len(),
        target = %config.log_target(),
        "Replaying event script"
    );

    let mut machine = FlatMachine::new();
    let mut session = TraceSession::init(config);
    let mut host_events = 0;

    for (line, event) in &events {
        if event.apply_to(&mut machine) {
            host_events += 1;
            continue;
        }
        tracing::trace!(line, event = event.event_type(), "Dispatching event");
        session.dispatch(&machine, event);
    }

    let summary = session.summary();
    let lines_written = session.close().context("Failed to close trace log")?;

    let report = ReplayReport {
        script: args.script.display().to_string(),
        events: events.len(),
        host_events,
        session: summary,
        lines_written,
    };

    // Output results
    match format {
        OutputFormat::Human => {
            if !quiet {
                println!("Replayed {} events from {}", report.events, report.script);
                println!("  Host events: {}", report.host_events);
                println!("  Trace lines: {}", report.lines_written);
                println!("  Still active: {}", report.session.active);
                println!("  Final depth: {}", report.session.depth);
                if let Some(reason) = &report.session.sink_fallback {
                    println!("  Log file not used: {}", reason);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_skips_comments_and_blanks() {
        let source = r#"
# launch the game
{"event":"set_registers","ss":2623}
{"event":"program_exec","filename":"GAME.EXE","cmdline":"/nosound"}

{"event":"program_terminated","exit_code":0}
"#;
        let events = parse_script(source).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].0, 3);
        assert_eq!(events[1].1.event_type(), "program_exec");
        assert_eq!(events[2].0, 6);
    }

    #[test]
    fn test_parse_script_reports_line() {
        let source = "{\"event\":\"program_terminated\",\"exit_code\":0}\n{\"event\":\"bogus\"}\n";
        let err = parse_script(source).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
