//! dostrace Core - tracing engine primitives
//!
//! This crate provides the building blocks of the dostrace execution tracer
//! for virtual DOS machines:
//!
//! - [`TraceConfig`]: the `[debugtrace]` configuration snapshot
//! - [`TraceSink`] and [`TraceWriter`]: line-atomic output with the
//!   elapsed-time prefix
//! - [`Activation`]: the activation and process-depth state machine
//! - [`is_interrupt_excluded`]: the interrupt exclusion filter
//! - [`Machine`] and [`Shell`]: what the host emulator exposes to the tracer
//!
//! # Quick Start
//!
//! ```ignore
//! use dostrace_core::prelude::*;
//!
//! let (sink, capture) = TraceSink::memory();
//! let mut writer = TraceWriter::new(sink, Box::new(MonotonicClock::new()));
//! writer.reset_epoch();
//! writer.emit_banner("=== TRACE LOGGING STARTED ===");
//! assert_eq!(capture.len(), 1);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Host emulator                │
//! ├─────────────────────────────────────────┤
//! │          dostrace (facade)              │
//! ├─────────────────────────────────────────┤
//! │  dostrace-core  │  dostrace-observe     │
//! └─────────────────────────────────────────┘
//! ```

pub mod activation;
pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod line;
pub mod machine;
pub mod sink;

// Re-export main types at crate root
pub use activation::{Activation, ActivationState, TerminateOutcome};
pub use clock::{Clock, Epoch, ManualClock, MonotonicClock};
pub use config::{LogTarget, MAX_HEX_DUMP_BYTES, OPTIONS, OptionDescriptor, TraceConfig};
pub use error::{ConfigError, ConfigResult, SinkError, SinkResult};
pub use filter::is_interrupt_excluded;
pub use line::{DATA_LINE_CAPACITY, LINE_CAPACITY, LineBuf};
pub use machine::{FlatMachine, Machine, Registers, Shell, real_mode_address};
pub use sink::{MemorySink, TraceSink, TraceWriter};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::activation::{Activation, ActivationState};
    pub use crate::clock::{Clock, ManualClock, MonotonicClock};
    pub use crate::config::{LogTarget, TraceConfig};
    pub use crate::error::{ConfigError, SinkError};
    pub use crate::machine::{FlatMachine, Machine, Registers, Shell};
    pub use crate::sink::{MemorySink, TraceSink, TraceWriter};
}
