//! The trace session: one explicitly owned tracer per emulator run.
//!
//! The host emulator creates a [`TraceSession`] at startup and calls one
//! entry point per event on its dispatch paths. Every entry point is total:
//! it either writes trace lines or does nothing, and never reports an error
//! back to the emulator.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use dostrace_core::{
    Activation, Clock, Machine, MonotonicClock, Shell, SinkError, TraceConfig, TraceSink,
    TraceWriter, is_interrupt_excluded,
};
use dostrace_observe::{
    FileIoLogger, HandleMap, InstructionLogger, PendingRead, TraceEvent, exec, log_interrupt,
    log_mode_switch,
};

use crate::TraceError;

const STARTED_BANNER: &str = "=== TRACE LOGGING STARTED ===";
const DEACTIVATED_BANNER: &str = "=== TRACE LOGGING DEACTIVATED (program exited) ===";
const ENDED_BANNER: &str = "=== TRACE LOGGING ENDED ===";

/// Unique identifier for a trace session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builder for configuring a trace session.
pub struct TraceSessionBuilder {
    config: TraceConfig,
    clock: Option<Box<dyn Clock>>,
    sink: Option<TraceSink>,
    console: Option<TraceSink>,
}

impl TraceSessionBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: TraceConfig::default(),
            clock: None,
            sink: None,
            console: None,
        }
    }

    /// Set the configuration snapshot.
    pub fn with_config(mut self, config: TraceConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom clock instead of the monotonic wall clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Write to this sink instead of the configured `logfile`.
    pub fn with_sink(mut self, sink: TraceSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Route console output (`logfile = stdout`, or the fallback after an
    /// unopenable log file) to this sink instead of standard output.
    pub fn with_console(mut self, console: TraceSink) -> Self {
        self.console = Some(console);
        self
    }

    /// Build the session.
    ///
    /// Never fails: an unopenable log file degrades to the console and is
    /// reported through [`TraceSession::sink_fallback`].
    pub fn build(self) -> TraceSession {
        let config = self.config.sanitized();
        let mut session = TraceSession {
            id: SessionId::new(),
            instructions: InstructionLogger::new(config.sample_rate()),
            config,
            ready: false,
            activation: Activation::new(),
            writer: None,
            files: FileIoLogger::new(),
            sink_fallback: None,
            final_lines: 0,
        };

        if !session.config.enabled {
            debug!(session = %session.id, "Tracing disabled");
            return session;
        }

        let (sink, fallback) = match self.sink {
            Some(sink) => (sink, None),
            None => match (TraceSink::open(&session.config.log_target()), self.console) {
                ((sink, fallback), Some(console)) if sink.is_console() => (console, fallback),
                (opened, _) => opened,
            },
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(MonotonicClock::new()));
        let mut writer = TraceWriter::new(sink, clock);

        if let Some(error) = &fallback {
            writer.emit_banner(&format!("WARNING: {}, falling back to stdout", error));
        }
        if session.config.max_log_size_mb > 0 {
            warn!(
                max_log_size_mb = session.config.max_log_size_mb,
                "Log rotation is not supported; the trace log will grow without bound"
            );
        }

        if session.config.eager_enabled() {
            session.activation.activate();
            writer.reset_epoch();
            writer.emit_banner(STARTED_BANNER);
        }

        info!(
            session = %session.id,
            target = %session.config.log_target(),
            eager = session.config.eager_enabled(),
            "Trace session initialized"
        );

        session.writer = Some(writer);
        session.sink_fallback = fallback;
        session.ready = true;
        session
    }
}

impl Default for TraceSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a session, for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session ID.
    pub session_id: SessionId,
    /// Whether a sink is open.
    pub ready: bool,
    /// Whether trace lines are being produced.
    pub active: bool,
    /// Nested program depth.
    pub depth: i32,
    /// Milliseconds since the epoch.
    pub elapsed_ms: u64,
    /// Lines written to the sink.
    pub lines_written: u64,
    /// Lines the sink failed to accept.
    pub write_errors: u64,
    /// Why the configured log file was not used, if it was not.
    pub sink_fallback: Option<String>,
}

/// A trace session.
pub struct TraceSession {
    id: SessionId,
    config: TraceConfig,
    ready: bool,
    activation: Activation,
    writer: Option<TraceWriter>,
    instructions: InstructionLogger,
    files: FileIoLogger,
    sink_fallback: Option<SinkError>,
    final_lines: u64,
}

impl TraceSession {
    /// Create a session builder.
    pub fn builder() -> TraceSessionBuilder {
        TraceSessionBuilder::new()
    }

    /// Start a session with the wall clock and the configured sink.
    pub fn init(config: TraceConfig) -> Self {
        TraceSessionBuilder::new().with_config(config).build()
    }

    /// Load a configuration file and start a session from it.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let config = TraceConfig::load(path)?;
        Ok(Self::init(config))
    }

    // Entry points

    /// The CPU is about to execute the instruction at `cs:ip`.
    pub fn instruction_fetched<M: Machine + ?Sized>(&mut self, machine: &M, cs: u16, ip: u16) {
        if !self.activation.is_active() || !self.config.trace_instructions {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        self.instructions.log(writer, machine, cs, ip);
    }

    /// A software interrupt is being invoked.
    pub fn interrupt_invoked<M: Machine + ?Sized>(&mut self, machine: &M, int_num: u8) {
        if !self.activation.is_active() || !self.config.trace_interrupts {
            return;
        }
        if is_interrupt_excluded(&self.config.exclude_interrupts, int_num) {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        log_interrupt(writer, machine, int_num);
    }

    /// INT 21h/AH=3Ch is about to create a file.
    pub fn file_created(&mut self, filename: &str, attributes: u16) {
        if !self.activation.is_active() || !self.config.trace_file_io {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        self.files.log_create(writer, filename, attributes);
    }

    /// INT 21h/AH=3Dh is about to open a file.
    pub fn file_opened(&mut self, filename: &str, mode: u8) {
        if !self.activation.is_active() || !self.config.trace_file_io {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        self.files.log_open(writer, filename, mode);
    }

    /// A create or open returned `handle`.
    ///
    /// Recorded in every state so that a trace activated mid-run can still
    /// name files opened before it.
    pub fn handle_opened(&mut self, handle: u16, filename: &str) {
        self.files.record_handle(handle, filename);
    }

    /// INT 21h/AH=3Eh is about to close `handle`.
    ///
    /// The mapping is dropped whether or not the close is logged.
    pub fn file_closed(&mut self, handle: u16) {
        let writer = match self.writer.as_mut() {
            Some(writer) if self.activation.is_active() && self.config.trace_file_io => writer,
            _ => {
                self.files.forget_handle(handle);
                return;
            }
        };
        self.files.log_close(writer, handle);
    }

    /// INT 21h/AH=3Fh is about to read into `segment:offset`.
    pub fn read_issued(&mut self, handle: u16, requested: u16, segment: u16, offset: u16) {
        if !self.activation.is_active() || !self.config.trace_file_io {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        self.files
            .log_read_issued(writer, handle, requested, segment, offset);
    }

    /// INT 21h/AH=3Fh returned `actual` bytes at physical address `buffer`.
    pub fn read_completed<M: Machine + ?Sized>(
        &mut self,
        machine: &M,
        handle: u16,
        actual: u16,
        buffer: u32,
    ) {
        if !self.activation.is_active() || !self.config.trace_file_io {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let hex_cap = self.config.hex_dump_bytes();
        self.files
            .log_read_completed(writer, machine, handle, actual, buffer, hex_cap);
    }

    /// INT 21h/AH=4Bh is loading a program.
    ///
    /// In EXEC-triggered mode the first qualifying load activates tracing;
    /// while active every load nests one level deeper.
    pub fn program_exec<M, S>(&mut self, machine: &M, shell: &S, filename: &str, cmdline: Option<&str>)
    where
        M: Machine + ?Sized,
        S: Shell + ?Sized,
    {
        if !self.ready {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        let activated = if self.activation.is_active() {
            false
        } else {
            if !self.config.auto_trace_on_exec {
                return;
            }
            if self.config.interactive_only && shell.is_batch_running() {
                debug!(program = filename, "Program load from a batch script does not start tracing");
                return;
            }
            self.activation.activate();
            writer.reset_epoch();
            info!(session = %self.id, program = filename, "Tracing activated by program load");
            true
        };

        exec::log_exec(writer, machine, filename, cmdline.unwrap_or(""));
        if activated {
            exec::log_activated(writer);
        }
        self.activation.push_exec();
    }

    /// A program exited normally.
    ///
    /// Must not be called for terminate-and-stay-resident exits; use
    /// [`TraceSession::program_stayed_resident`].
    pub fn program_terminated(&mut self, exit_code: u8) {
        if !self.activation.is_active() {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let Some(outcome) = self.activation.terminate() else {
            return;
        };

        exec::log_terminated(writer, exit_code, outcome.remaining);
        if outcome.deactivated {
            writer.emit_banner(DEACTIVATED_BANNER);
            info!(session = %self.id, exit_code, "Tracing deactivated after top-level program exit");
        }
    }

    /// A program exited and stayed resident. The nesting depth is unchanged.
    pub fn program_stayed_resident(&mut self, exit_code: u8) {
        if !self.activation.is_active() {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        exec::log_stayed_resident(writer, exit_code, self.activation.depth());
    }

    /// INT 10h is about to switch from `old_mode` to `new_mode`.
    pub fn video_mode_changing(&mut self, old_mode: u16, new_mode: u16) {
        if !self.activation.is_active() || !self.config.trace_video_modes {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        log_mode_switch(writer, old_mode, new_mode);
    }

    /// Replace the configuration snapshot.
    ///
    /// The sink is not reopened. On a ready session the activation state is
    /// re-derived from `enabled && !auto_trace_on_exec`: eager mode switches
    /// tracing on, EXEC-triggered mode switches it off until the next load.
    pub fn config_updated(&mut self, config: TraceConfig) {
        let config = config.sanitized();
        if config.sample_rate() != self.instructions.stride() {
            self.instructions.set_stride(config.sample_rate());
        }
        self.config = config;

        if !self.ready {
            return;
        }
        if self.config.eager_enabled() {
            if self.activation.activate() {
                if let Some(writer) = self.writer.as_mut() {
                    writer.ensure_epoch();
                }
            }
        } else {
            self.activation.deactivate();
        }
        debug!(
            session = %self.id,
            active = self.activation.is_active(),
            "Trace configuration updated"
        );
    }

    /// Route a recorded event to its entry point.
    ///
    /// Host mutations (`set_registers`, `poke`, `set_batch`) are not tracer
    /// events; they return false and leave the session untouched.
    pub fn dispatch<H>(&mut self, host: &H, event: &TraceEvent) -> bool
    where
        H: Machine + Shell + ?Sized,
    {
        match event {
            TraceEvent::InstructionFetched { cs, ip } => self.instruction_fetched(host, *cs, *ip),
            TraceEvent::InterruptInvoked { int_num } => self.interrupt_invoked(host, *int_num),
            TraceEvent::FileCreated {
                filename,
                attributes,
            } => self.file_created(filename, *attributes),
            TraceEvent::FileOpened { filename, mode } => self.file_opened(filename, *mode),
            TraceEvent::HandleOpened { handle, filename } => self.handle_opened(*handle, filename),
            TraceEvent::FileClosed { handle } => self.file_closed(*handle),
            TraceEvent::ReadIssued {
                handle,
                requested,
                segment,
                offset,
            } => self.read_issued(*handle, *requested, *segment, *offset),
            TraceEvent::ReadCompleted {
                handle,
                actual,
                buffer,
            } => self.read_completed(host, *handle, *actual, *buffer),
            TraceEvent::ProgramExec { filename, cmdline } => {
                self.program_exec(host, host, filename, cmdline.as_deref())
            }
            TraceEvent::ProgramTerminated { exit_code } => self.program_terminated(*exit_code),
            TraceEvent::ProgramStayedResident { exit_code } => {
                self.program_stayed_resident(*exit_code)
            }
            TraceEvent::VideoModeChanging { old_mode, new_mode } => {
                self.video_mode_changing(*old_mode, *new_mode)
            }
            TraceEvent::SetRegisters(_) | TraceEvent::Poke { .. } | TraceEvent::SetBatch { .. } => {
                return false;
            }
        }
        true
    }

    // Lifecycle

    /// Write the closing banner and release the sink.
    ///
    /// Safe to call more than once. The closing banner only goes to
    /// non-console sinks.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.finish() {
            warn!(session = %self.id, error = %e, "Failed to close trace log");
        }
    }

    /// Like [`TraceSession::shutdown`], but reports a failure to flush.
    ///
    /// Returns the total number of lines written.
    pub fn close(mut self) -> Result<u64, TraceError> {
        self.finish()?;
        Ok(self.final_lines)
    }

    fn finish(&mut self) -> Result<(), TraceError> {
        self.ready = false;
        self.activation.deactivate();
        self.files.reset();

        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        if !writer.sink().is_console() {
            writer.emit_banner(ENDED_BANNER);
        }
        self.final_lines = writer.lines_written();
        info!(session = %self.id, lines = self.final_lines, "Trace session ended");
        writer.close()?;
        Ok(())
    }

    // Accessors

    /// Get the session ID.
    pub fn session_id(&self) -> SessionId {
        self.id
    }

    /// Whether the session opened a sink and accepts events.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether trace lines are currently being produced.
    pub fn is_active(&self) -> bool {
        self.activation.is_active()
    }

    /// Current nesting depth.
    pub fn depth(&self) -> i32 {
        self.activation.depth()
    }

    /// Milliseconds since the epoch, 0 before the first activation.
    pub fn elapsed_ms(&self) -> u64 {
        self.writer.as_ref().map_or(0, TraceWriter::elapsed_ms)
    }

    /// Get the configuration snapshot.
    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Why the configured log file was not used, if it was not.
    pub fn sink_fallback(&self) -> Option<&SinkError> {
        self.sink_fallback.as_ref()
    }

    /// Lines written so far, including after shutdown.
    pub fn lines_written(&self) -> u64 {
        self.writer
            .as_ref()
            .map_or(self.final_lines, TraceWriter::lines_written)
    }

    /// Get the handle correlation table.
    pub fn handles(&self) -> &HandleMap {
        self.files.handles()
    }

    /// Get the pending-read slot.
    pub fn pending_read(&self) -> &PendingRead {
        self.files.pending()
    }

    /// Snapshot for reporting.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            ready: self.ready,
            active: self.is_active(),
            depth: self.depth(),
            elapsed_ms: self.elapsed_ms(),
            lines_written: self.lines_written(),
            write_errors: self.writer.as_ref().map_or(0, TraceWriter::write_errors),
            sink_fallback: self.sink_fallback.as_ref().map(ToString::to_string),
        }
    }
}

impl Drop for TraceSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TraceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceSession")
            .field("id", &self.id)
            .field("ready", &self.ready)
            .field("activation", &self.activation)
            .field("writer", &self.writer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dostrace_core::{FlatMachine, ManualClock, MemorySink, Registers};

    fn session(config: TraceConfig) -> (TraceSession, MemorySink, ManualClock) {
        let clock = ManualClock::new();
        let (sink, capture) = TraceSink::memory();
        let session = TraceSession::builder()
            .with_config(config)
            .with_clock(clock.clone())
            .with_sink(sink)
            .build();
        (session, capture, clock)
    }

    fn auto() -> TraceConfig {
        TraceConfig::default()
            .with_enabled(true)
            .with_excluded_interrupts("")
    }

    fn eager() -> TraceConfig {
        auto().with_auto_trace_on_exec(false)
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("dostrace-{}-{}.log", name, Uuid::new_v4()))
    }

    #[test]
    fn test_disabled_session_is_inert() {
        let (mut session, capture, _) = session(TraceConfig::default());
        let machine = FlatMachine::new();

        assert!(!session.is_ready());
        session.program_exec(&machine, &machine, "GAME.EXE", None);
        session.instruction_fetched(&machine, 0x1000, 0);
        session.interrupt_invoked(&machine, 0x21);
        session.program_terminated(0);
        session.shutdown();

        assert!(!session.is_active());
        assert!(capture.is_empty());
    }

    #[test]
    fn test_disabled_session_still_records_handles() {
        let (mut session, _, _) = session(TraceConfig::default());
        session.handle_opened(5, "A.DAT");
        assert_eq!(session.handles().lookup(5), "A.DAT");
    }

    #[test]
    fn test_eager_activation_banner() {
        let (session, capture, _) = session(eager());
        assert!(session.is_ready());
        assert!(session.is_active());
        assert_eq!(session.depth(), 0);
        assert_eq!(capture.lines(), vec!["[debugtrace] === TRACE LOGGING STARTED ===".to_string()]);
    }

    #[test]
    fn test_auto_mode_waits_for_exec() {
        let (mut session, capture, _) = session(auto());
        let machine = FlatMachine::new();

        assert!(session.is_ready());
        assert!(!session.is_active());
        session.interrupt_invoked(&machine, 0x21);
        session.instruction_fetched(&machine, 0x1000, 0);
        assert!(capture.is_empty());
    }

    #[test]
    fn test_exec_activation_order_and_epoch_reset() {
        let (mut session, capture, clock) = session(auto());
        let mut machine = FlatMachine::new();
        machine.registers_mut().ss = 0x0A3F;

        clock.advance(5_000);
        session.program_exec(&machine, &machine, "KEEN4.EXE", Some("/nojoy"));
        clock.advance(250);
        session.interrupt_invoked(&machine, 0x10);

        let lines = capture.lines();
        assert_eq!(
            lines[0],
            "[T+00000000ms] === PROGRAM EXEC: \"KEEN4.EXE\" args=\"/nojoy\" PSP=0A3F ==="
        );
        assert_eq!(lines[1], "[T+00000000ms] === FULL TRACE LOGGING ACTIVATED ===");
        assert!(lines[2].starts_with("[T+00000250ms] >> INT 10h"));
        assert!(session.is_active());
        assert_eq!(session.depth(), 1);
    }

    #[test]
    fn test_nested_exec_deactivates_once() {
        let (mut session, capture, _) = session(auto());
        let machine = FlatMachine::new();

        for name in ["SHELL.EXE", "GAME.EXE", "SETUP.EXE"] {
            session.program_exec(&machine, &machine, name, None);
        }
        assert_eq!(session.depth(), 3);
        assert_eq!(capture.count_containing("ACTIVATED"), 1);

        session.program_terminated(0);
        assert!(session.is_active());
        session.program_terminated(0);
        assert!(session.is_active());
        assert_eq!(capture.count_containing("DEACTIVATED"), 0);

        session.program_terminated(0);
        assert!(!session.is_active());
        assert_eq!(session.depth(), 0);
        assert_eq!(capture.count_containing("DEACTIVATED"), 1);

        let lines = capture.lines();
        assert!(lines[lines.len() - 2].ends_with("(exit code 0, remaining depth 0) ==="));
        assert_eq!(
            lines[lines.len() - 1],
            "[debugtrace] === TRACE LOGGING DEACTIVATED (program exited) ==="
        );

        // Further exits are ignored while inactive
        session.program_terminated(0);
        assert_eq!(capture.count_containing("DEACTIVATED"), 1);
        assert_eq!(capture.count_containing("TERMINATED"), 3);
    }

    #[test]
    fn test_tsr_exit_keeps_depth() {
        let (mut session, capture, _) = session(auto());
        let machine = FlatMachine::new();

        session.program_exec(&machine, &machine, "GAME.EXE", None);
        session.program_exec(&machine, &machine, "MOUSE.COM", None);
        session.program_stayed_resident(0);
        assert_eq!(session.depth(), 2);
        assert!(session.is_active());
        assert!(capture.lines().last().unwrap().ends_with("STAYED RESIDENT (exit code 0, depth 2) ==="));

        session.program_terminated(0);
        assert_eq!(session.depth(), 1);
        assert!(session.is_active());
    }

    #[test]
    fn test_eager_mode_termination_deactivates() {
        let (mut session, capture, _) = session(eager());
        let machine = FlatMachine::new();

        session.program_exec(&machine, &machine, "GAME.EXE", None);
        assert_eq!(session.depth(), 1);
        assert_eq!(capture.count_containing("ACTIVATED"), 0);

        session.program_terminated(0);
        assert!(!session.is_active());

        // Eager mode does not re-arm on the next load
        session.program_exec(&machine, &machine, "GAME.EXE", None);
        assert!(!session.is_active());
    }

    #[test]
    fn test_exit_before_any_exec_deactivates_eager_trace() {
        let (mut session, capture, _) = session(eager());
        session.program_terminated(1);
        assert!(!session.is_active());
        assert!(capture.lines()[1].ends_with("(exit code 1, remaining depth -1) ==="));
    }

    #[test]
    fn test_reactivation_resets_epoch() {
        let (mut session, capture, clock) = session(auto());
        let machine = FlatMachine::new();

        session.program_exec(&machine, &machine, "GAME.EXE", None);
        clock.advance(10_000);
        session.program_terminated(0);
        assert!(!session.is_active());

        clock.advance(3_000);
        capture.take();
        session.program_exec(&machine, &machine, "GAME.EXE", None);
        assert!(session.is_active());
        assert_eq!(session.depth(), 1);
        let lines = capture.lines();
        assert!(lines[0].starts_with("[T+00000000ms] === PROGRAM EXEC"));
        assert!(lines[1].starts_with("[T+00000000ms] === FULL TRACE LOGGING ACTIVATED"));
    }

    #[test]
    fn test_interactive_only_gates_batch_exec() {
        let (mut session, capture, _) = session(auto().with_interactive_only(true));
        let mut machine = FlatMachine::new();

        machine.set_batch_running(true);
        session.program_exec(&machine, &machine, "AUTOEXEC.EXE", None);
        assert!(!session.is_active());
        assert!(capture.is_empty());

        machine.set_batch_running(false);
        session.program_exec(&machine, &machine, "GAME.EXE", None);
        assert!(session.is_active());
        assert_eq!(session.depth(), 1);
    }

    #[test]
    fn test_interactive_only_does_not_gate_children() {
        let (mut session, capture, _) = session(auto().with_interactive_only(true));
        let mut machine = FlatMachine::new();

        session.program_exec(&machine, &machine, "GAME.EXE", None);
        machine.set_batch_running(true);
        session.program_exec(&machine, &machine, "CHILD.EXE", None);
        assert_eq!(session.depth(), 2);
        assert_eq!(capture.count_containing("PROGRAM EXEC"), 2);
    }

    #[test]
    fn test_batch_exec_activates_without_restriction() {
        let (mut session, _, _) = session(auto());
        let mut machine = FlatMachine::new();
        machine.set_batch_running(true);
        session.program_exec(&machine, &machine, "GAME.EXE", None);
        assert!(session.is_active());
    }

    #[test]
    fn test_interrupt_exclusion() {
        let (mut session, capture, _) = session(eager().with_excluded_interrupts("08, 1c,21"));
        let machine = FlatMachine::new();
        capture.take();

        for n in 0..=255u8 {
            session.interrupt_invoked(&machine, n);
        }
        let lines = capture.lines();
        assert_eq!(lines.len(), 253);
        for excluded in ["INT 08h", "INT 1Ch", "INT 21h"] {
            assert!(lines.iter().all(|line| !line.contains(excluded)));
        }
        assert_eq!(capture.count_containing("INT 10h AH=00h AL=00h"), 1);
    }

    #[test]
    fn test_category_flags() {
        let config = eager()
            .with_instructions(false)
            .with_interrupts(false)
            .with_file_io(false)
            .with_video_modes(false);
        let (mut session, capture, _) = session(config);
        let machine = FlatMachine::new();
        capture.take();

        session.instruction_fetched(&machine, 0x1000, 0);
        session.interrupt_invoked(&machine, 0x21);
        session.file_created("A.DAT", 0);
        session.file_opened("A.DAT", 0);
        session.read_issued(3, 10, 0, 0);
        session.read_completed(&machine, 3, 10, 0);
        session.file_closed(3);
        session.video_mode_changing(0x03, 0x13);
        assert!(capture.is_empty());

        // Program lifecycle lines are not a category
        session.program_exec(&machine, &machine, "GAME.EXE", None);
        assert_eq!(capture.len(), 1);
    }

    #[test]
    fn test_instruction_sampling() {
        let (mut session, capture, _) = session(eager().with_sample_rate(10));
        let machine = FlatMachine::new();
        capture.take();

        for ip in 0..100u16 {
            session.instruction_fetched(&machine, 0x1000, ip);
        }
        assert_eq!(capture.count_containing("CS:IP="), 10);
    }

    #[test]
    fn test_instruction_every_fetch() {
        let (mut session, capture, _) = session(eager());
        let machine = FlatMachine::new();
        capture.take();

        for ip in 0..50u16 {
            session.instruction_fetched(&machine, 0x1000, ip);
        }
        assert_eq!(capture.count_containing("CS:IP="), 50);
    }

    #[test]
    fn test_handle_lifecycle() {
        let (mut session, capture, _) = session(eager());
        let mut machine = FlatMachine::new();
        machine.poke(0x20000, b"DATA");
        capture.take();

        session.file_opened("A.DAT", 0x00);
        session.handle_opened(5, "A.DAT");
        session.read_issued(5, 4, 0x2000, 0x0000);
        session.read_completed(&machine, 5, 4, 0x20000);
        session.file_closed(5);

        let lines = capture.lines();
        assert!(lines[0].ends_with("FILE OPEN: \"A.DAT\" mode=read-only (AL=0x00)"));
        assert!(lines[1].ends_with("FILE READ: \"A.DAT\" (handle=5) requested=4 buffer=2000:0000"));
        assert!(lines[2].ends_with("FILE READ RESULT: \"A.DAT\" (handle=5) actual=4"));
        assert!(lines[3].ends_with("FILE DATA [first 4 bytes]: 44 41 54 41"));
        assert!(lines[4].ends_with("FILE CLOSE: \"A.DAT\" (handle=5)"));
        assert_eq!(session.handles().lookup(5), "<unknown>");
    }

    #[test]
    fn test_read_correlation_and_cap() {
        let (mut session, capture, _) = session(eager().with_hex_dump_bytes(16));
        let machine = FlatMachine::new();
        capture.take();

        session.read_issued(3, 100, 0x1000, 0);
        session.read_completed(&machine, 3, 40, 0x10000);
        assert_eq!(capture.count_containing("actual=40"), 1);
        assert_eq!(capture.count_containing("[first 16 bytes]"), 1);

        capture.take();
        session.read_completed(&machine, 7, 40, 0x10000);
        assert!(capture.is_empty());
        assert!(!session.pending_read().is_pending());
    }

    #[test]
    fn test_hex_dump_disabled() {
        let (mut session, capture, _) = session(eager().with_hex_dump_bytes(0));
        let machine = FlatMachine::new();

        session.read_issued(3, 100, 0x1000, 0);
        session.read_completed(&machine, 3, 100, 0x10000);
        assert_eq!(capture.count_containing("FILE READ RESULT"), 1);
        assert_eq!(capture.count_containing("FILE DATA"), 0);
    }

    #[test]
    fn test_close_while_inactive_forgets_handle() {
        let (mut session, capture, _) = session(auto());
        session.handle_opened(5, "A.DAT");
        session.file_closed(5);
        assert!(capture.is_empty());
        assert_eq!(session.handles().lookup(5), "<unknown>");
    }

    #[test]
    fn test_handle_opened_before_activation_is_named() {
        let (mut session, capture, _) = session(auto());
        let machine = FlatMachine::new();

        session.handle_opened(7, "CONFIG.DAT");
        session.program_exec(&machine, &machine, "GAME.EXE", None);
        session.read_issued(7, 16, 0x2000, 0);
        assert_eq!(capture.count_containing("FILE READ: \"CONFIG.DAT\" (handle=7)"), 1);
    }

    #[test]
    fn test_video_mode_switch() {
        let (mut session, capture, _) = session(eager());
        session.video_mode_changing(0x03, 0x13);
        assert_eq!(capture.count_containing("VIDEO MODE SWITCH: 03h"), 1);
        assert_eq!(capture.count_containing("-> 13h (320x200 256-color VGA)"), 1);
    }

    #[test]
    fn test_config_updated_rederives_flag() {
        let (mut session, capture, clock) = session(auto());
        let machine = FlatMachine::new();

        clock.advance(700);
        session.config_updated(eager());
        assert!(session.is_active());
        assert_eq!(session.elapsed_ms(), 0);

        session.program_exec(&machine, &machine, "GAME.EXE", None);
        assert_eq!(session.depth(), 1);

        session.config_updated(auto());
        assert!(!session.is_active());
        assert_eq!(session.depth(), 0);
        assert_eq!(capture.count_containing("PROGRAM EXEC"), 1);
    }

    #[test]
    fn test_config_updated_keeps_running_epoch() {
        let (mut session, _, clock) = session(eager());
        clock.advance(400);
        session.config_updated(eager().with_sample_rate(5));
        assert!(session.is_active());
        assert_eq!(session.elapsed_ms(), 400);
    }

    #[test]
    fn test_config_updated_changes_stride() {
        let (mut session, capture, _) = session(eager());
        let machine = FlatMachine::new();
        session.config_updated(eager().with_sample_rate(4));
        capture.take();

        for ip in 0..20u16 {
            session.instruction_fetched(&machine, 0x1000, ip);
        }
        assert_eq!(capture.len(), 5);
    }

    #[test]
    fn test_config_updated_on_disabled_session() {
        let (mut session, capture, _) = session(TraceConfig::default());
        session.config_updated(eager());
        assert!(!session.is_ready());
        assert!(!session.is_active());
        assert!(capture.is_empty());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (mut session, capture, _) = session(eager());
        session.handle_opened(5, "A.DAT");
        session.shutdown();
        session.shutdown();

        assert!(!session.is_ready());
        assert!(!session.is_active());
        assert!(session.handles().is_empty());
        assert_eq!(capture.count_containing("TRACE LOGGING ENDED"), 1);
        assert_eq!(session.lines_written(), 2);
    }

    #[test]
    fn test_drop_writes_closing_banner() {
        let (sink, capture) = TraceSink::memory();
        {
            let _session = TraceSession::builder()
                .with_config(eager())
                .with_clock(ManualClock::new())
                .with_sink(sink)
                .build();
        }
        assert_eq!(
            capture.lines().last().map(String::as_str),
            Some("[debugtrace] === TRACE LOGGING ENDED ===")
        );
    }

    #[test]
    fn test_file_sink_round_trip() {
        let path = temp_path("session");
        let config = eager().with_logfile(path.to_string_lossy());
        let mut session = TraceSession::builder()
            .with_config(config)
            .with_clock(ManualClock::new())
            .build();
        assert!(session.sink_fallback().is_none());

        session.video_mode_changing(0x03, 0x13);
        assert_eq!(session.close().unwrap(), 3);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "[debugtrace] === TRACE LOGGING STARTED ===");
        assert!(lines[1].contains("VIDEO MODE SWITCH"));
        assert_eq!(lines[2], "[debugtrace] === TRACE LOGGING ENDED ===");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unopenable_log_falls_back_to_console() {
        let path = std::env::temp_dir()
            .join(format!("dostrace-missing-{}", Uuid::new_v4()))
            .join("trace.log");
        let config = auto().with_logfile(path.to_string_lossy());
        let session = TraceSession::builder()
            .with_config(config)
            .with_clock(ManualClock::new())
            .build();

        assert!(session.is_ready());
        assert!(session.sink_fallback().is_some());
        assert!(session.summary().sink_fallback.is_some());
    }

    #[test]
    fn test_fallback_warning_precedes_started_banner() {
        let path = std::env::temp_dir()
            .join(format!("dostrace-missing-{}", Uuid::new_v4()))
            .join("trace.log");
        let (console, capture) = TraceSink::memory();
        let session = TraceSession::builder()
            .with_config(eager().with_logfile(path.to_string_lossy()))
            .with_clock(ManualClock::new())
            .with_console(console)
            .build();

        assert!(session.sink_fallback().is_some());
        let lines = capture.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[debugtrace] WARNING: cannot open log file"));
        assert!(lines[0].ends_with("falling back to stdout"));
        assert_eq!(lines[1], "[debugtrace] === TRACE LOGGING STARTED ===");
    }

    #[test]
    fn test_console_override_receives_stdout_target() {
        let (console, capture) = TraceSink::memory();
        let mut session = TraceSession::builder()
            .with_config(eager().with_logfile("stdout"))
            .with_clock(ManualClock::new())
            .with_console(console)
            .build();

        assert!(session.sink_fallback().is_none());
        session.program_terminated(0);
        assert_eq!(capture.count_containing("TRACE LOGGING STARTED"), 1);
        assert_eq!(capture.count_containing("TRACE LOGGING DEACTIVATED"), 1);
    }

    #[test]
    fn test_dispatch_replays_events() {
        let (mut session, capture, _) = session(auto());
        let mut machine = FlatMachine::new();

        let script = [
            TraceEvent::SetRegisters(dostrace_observe::RegisterPatch {
                ax: Some(0x3D00),
                ..Default::default()
            }),
            TraceEvent::ProgramExec {
                filename: "GAME.EXE".to_string(),
                cmdline: None,
            },
            TraceEvent::InterruptInvoked { int_num: 0x21 },
            TraceEvent::FileOpened {
                filename: "LEVEL1.MAP".to_string(),
                mode: 0,
            },
            TraceEvent::HandleOpened {
                handle: 5,
                filename: "LEVEL1.MAP".to_string(),
            },
            TraceEvent::FileClosed { handle: 5 },
            TraceEvent::ProgramTerminated { exit_code: 0 },
        ];

        let mut dispatched = 0;
        for event in &script {
            if event.apply_to(&mut machine) {
                assert!(!session.dispatch(&machine, event));
            } else if session.dispatch(&machine, event) {
                dispatched += 1;
            }
        }

        assert_eq!(dispatched, 6);
        assert_eq!(capture.count_containing("(Open File)"), 1);
        assert_eq!(capture.count_containing("FILE CLOSE: \"LEVEL1.MAP\""), 1);
        assert!(!session.is_active());
    }

    #[test]
    fn test_summary() {
        let (mut session, _, clock) = session(auto());
        let mut machine = FlatMachine::new();
        machine.set_registers(Registers::default());

        session.program_exec(&machine, &machine, "GAME.EXE", None);
        clock.advance(42);

        let summary = session.summary();
        assert!(summary.ready);
        assert!(summary.active);
        assert_eq!(summary.depth, 1);
        assert_eq!(summary.elapsed_ms, 42);
        assert_eq!(summary.lines_written, 2);
        assert_eq!(summary.session_id, session.session_id());
    }
}
