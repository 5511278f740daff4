//! dostrace Observe - event formatters
//!
//! This crate turns emulator events into trace lines:
//!
//! - [`InstructionLogger`]: sampled instruction bytes and register state
//! - [`log_interrupt`]: software interrupts with a service description
//! - [`FileIoLogger`]: DOS file I/O with handle names and read hex dumps
//! - [`log_mode_switch`]: BIOS and VESA video mode switches
//! - [`log_exec`] and friends: program load and exit lines
//! - [`TraceEvent`]: the serializable form of every event, used for replay
//!
//! # Formatting a file read
//!
//! ```ignore
//! use dostrace_core::prelude::*;
//! use dostrace_observe::FileIoLogger;
//!
//! let (sink, capture) = TraceSink::memory();
//! let mut writer = TraceWriter::new(sink, Box::new(ManualClock::new()));
//! let machine = FlatMachine::new();
//!
//! let mut files = FileIoLogger::new();
//! files.record_handle(5, "LEVEL1.MAP");
//! files.log_read_issued(&mut writer, 5, 128, 0x2000, 0x0000);
//! files.log_read_completed(&mut writer, &machine, 5, 128, 0x20000, 64);
//! assert_eq!(capture.len(), 3);
//! ```

pub mod events;
pub mod exec;
pub mod file_io;
pub mod hex;
pub mod instruction;
pub mod interrupt;
pub mod tables;
pub mod video;

// Re-export main types
pub use events::{RegisterPatch, TraceEvent};
pub use exec::{ACTIVATED_BANNER, log_activated, log_exec, log_stayed_resident, log_terminated};
pub use file_io::{
    FileIoLogger, HandleMap, MAX_DOS_HANDLES, PendingRead, ReadRequest, UNKNOWN_FILE,
    access_mode_name,
};
pub use hex::{PaddedHex, write_hex_bytes};
pub use instruction::{InstructionLogger, OPCODE_WINDOW};
pub use interrupt::log_interrupt;
pub use tables::{describe_interrupt, describe_video_mode};
pub use video::{base_mode, describe_mode_value, log_mode_switch};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::events::TraceEvent;
    pub use crate::file_io::{FileIoLogger, HandleMap, PendingRead};
    pub use crate::instruction::InstructionLogger;
}
