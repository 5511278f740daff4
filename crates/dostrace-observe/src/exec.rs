//! Program load and exit lines.
//!
//! Deciding whether an EXEC activates tracing is the session's job; these
//! functions only render what it decided.

use std::fmt::Write as _;

use dostrace_core::{LINE_CAPACITY, Machine, TraceWriter};

/// Activation message embedded mid-trace right after the activating EXEC.
pub const ACTIVATED_BANNER: &str = "=== FULL TRACE LOGGING ACTIVATED ===";

/// Log a program load. The PSP segment is SS at EXEC time.
pub fn log_exec<M: Machine + ?Sized>(writer: &mut TraceWriter, machine: &M, filename: &str, cmdline: &str) {
    let psp = machine.registers().ss;
    writer.emit_timed(LINE_CAPACITY, |line| {
        write!(
            line,
            "=== PROGRAM EXEC: \"{}\" args=\"{}\" PSP={:04X} ===",
            filename, cmdline, psp
        )
    });
}

/// Log the activation message with the elapsed-time prefix.
pub fn log_activated(writer: &mut TraceWriter) {
    writer.emit_timed(LINE_CAPACITY, |line| line.write_str(ACTIVATED_BANNER));
}

/// Log a normal termination. `remaining` is the depth after the decrement.
pub fn log_terminated(writer: &mut TraceWriter, exit_code: u8, remaining: i32) {
    writer.emit_timed(LINE_CAPACITY, |line| {
        write!(
            line,
            "=== PROGRAM TERMINATED (exit code {}, remaining depth {}) ===",
            exit_code, remaining
        )
    });
}

/// Log a terminate-and-stay-resident exit. `depth` is unchanged by it.
pub fn log_stayed_resident(writer: &mut TraceWriter, exit_code: u8, depth: i32) {
    writer.emit_timed(LINE_CAPACITY, |line| {
        write!(
            line,
            "=== PROGRAM STAYED RESIDENT (exit code {}, depth {}) ===",
            exit_code, depth
        )
    });
}
