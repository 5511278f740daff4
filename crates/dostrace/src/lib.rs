//! # dostrace - Execution Tracing for Virtual DOS Machines
//!
//! dostrace is an opt-in instrumentation layer for x86/DOS emulators. It
//! captures a time-stamped, human-readable trace of a running DOS program:
//! sampled instructions, software interrupts, file I/O with hex dumps, video
//! mode switches, and program load/exit events.
//!
//! ## Features
//!
//! - **Cheap when off**: every entry point starts with a single flag test
//! - **EXEC-triggered**: tracing can wait for the first program load and
//!   stop when that program exits, following nested child processes
//! - **Correlated**: reads and closes are reported by filename, not handle
//! - **Never fatal**: an unopenable log file falls back to the console
//!
//! ## Quick Start
//!
//! ```ignore
//! use dostrace::prelude::*;
//!
//! let config = TraceConfig::default()
//!     .with_enabled(true)
//!     .with_logfile("game_trace.log");
//! let mut session = TraceSession::init(config);
//!
//! // From the emulator's DOS and CPU dispatch paths:
//! session.program_exec(&machine, &shell, "GAME.EXE", Some("/nosound"));
//! session.interrupt_invoked(&machine, 0x21);
//! session.program_terminated(0);
//!
//! session.shutdown();
//! ```
//!
//! ## Log Format
//!
//! ```text
//! [T+00000000ms] === PROGRAM EXEC: "GAME.EXE" args="/nosound" PSP=0A3F ===
//! [T+00000000ms] === FULL TRACE LOGGING ACTIVATED ===
//! [T+00000012ms] >> INT 21h AH=3Dh AL=00h (Open File)  AX=3D00 BX=0000 ...
//! [T+00000012ms] FILE OPEN: "LEVEL1.MAP" mode=read-only (AL=0x00)
//! [T+00001530ms] === PROGRAM TERMINATED (exit code 0, remaining depth 0) ===
//! [debugtrace] === TRACE LOGGING DEACTIVATED (program exited) ===
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Host emulator                        │
//! ├─────────────────────────────────────────────────────────┤
//! │                   dostrace (facade)                     │
//! │                  ┌────────────────┐                     │
//! │                  │  TraceSession  │                     │
//! │                  └───────┬────────┘                     │
//! │                          │                              │
//! │  ┌───────────────────────┴──┬────────────────────────┐  │
//! │  │ dostrace-core            │ dostrace-observe       │  │
//! │  │ (config, sink, clock,    │ (formatters, tables,   │  │
//! │  │  activation, filter)     │  correlation, events)  │  │
//! │  └──────────────────────────┴────────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod session;

pub use session::{SessionId, SessionSummary, TraceSession, TraceSessionBuilder};

// Re-export from sub-crates
pub use dostrace_core;
pub use dostrace_observe;

/// Errors from the dostrace facade.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] dostrace_core::ConfigError),

    /// The trace log could not be flushed.
    #[error("Trace log I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{SessionId, SessionSummary, TraceError, TraceSession, TraceSessionBuilder};

    // Core types
    pub use dostrace_core::{
        Clock, FlatMachine, LogTarget, Machine, ManualClock, MemorySink, MonotonicClock,
        Registers, Shell, TraceConfig, TraceSink,
    };

    // Observability types
    pub use dostrace_observe::{RegisterPatch, TraceEvent};
}
