//! DOS file I/O logger.
//!
//! Tracks which filename each open handle refers to so that later reads and
//! closes can name the file, and pairs the two halves of a read (issued
//! before the DOS call, completed after it) to render a hex dump of the data
//! that arrived.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use dostrace_core::{DATA_LINE_CAPACITY, LINE_CAPACITY, MAX_HEX_DUMP_BYTES, Machine, TraceWriter};

use crate::hex::write_hex_bytes;

/// Number of DOS file handles; valid handles are `0..MAX_DOS_HANDLES`.
pub const MAX_DOS_HANDLES: u16 = 255;

/// Name shown for a handle with no recorded filename.
pub const UNKNOWN_FILE: &str = "<unknown>";

/// Handle-to-filename correlation table.
#[derive(Debug, Clone, Default)]
pub struct HandleMap {
    names: HashMap<u16, String>,
}

impl HandleMap {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the filename used to open `handle`.
    ///
    /// Out-of-range handles and empty names are rejected. A later open on the
    /// same handle replaces the earlier name. Returns whether it was stored.
    pub fn record(&mut self, handle: u16, filename: &str) -> bool {
        if handle >= MAX_DOS_HANDLES || filename.is_empty() {
            debug!(handle, filename, "Ignoring untrackable file handle");
            return false;
        }
        self.names.insert(handle, filename.to_string());
        true
    }

    /// Filename for `handle`, or [`UNKNOWN_FILE`].
    pub fn lookup(&self, handle: u16) -> &str {
        self.names.get(&handle).map_or(UNKNOWN_FILE, String::as_str)
    }

    /// Remove the mapping for `handle`.
    pub fn forget(&mut self, handle: u16) -> Option<String> {
        self.names.remove(&handle)
    }

    /// Number of tracked handles.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no handles are tracked.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Drop every mapping.
    pub fn clear(&mut self) {
        self.names.clear();
    }
}

/// A read that has been issued but not yet completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// File handle (BX).
    pub handle: u16,
    /// Requested byte count (CX).
    pub requested: u16,
    /// Buffer segment (DS), kept for display.
    pub segment: u16,
    /// Buffer offset (DX), kept for display.
    pub offset: u16,
}

/// Single-slot correlator between read issue and read completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingRead {
    slot: Option<ReadRequest>,
}

impl PendingRead {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new request, discarding any unmatched earlier one.
    pub fn begin(&mut self, request: ReadRequest) {
        self.slot = Some(request);
    }

    /// Consume the slot if it holds a request for `handle`.
    ///
    /// The slot is cleared either way; a mismatch means the pairing cannot
    /// be traced and the stale request is dropped.
    pub fn complete(&mut self, handle: u16) -> Option<ReadRequest> {
        self.slot.take().filter(|request| request.handle == handle)
    }

    /// Check if a request is waiting.
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Drop any waiting request.
    pub fn clear(&mut self) {
        self.slot = None;
    }
}

/// Access mode name from the low two bits of AL.
pub fn access_mode_name(al_mode: u8) -> &'static str {
    match al_mode & 0x03 {
        0 => "read-only",
        1 => "write-only",
        2 => "read-write",
        _ => "unknown",
    }
}

/// File I/O logger state: handle names plus the pending read.
#[derive(Debug, Clone, Default)]
pub struct FileIoLogger {
    handles: HandleMap,
    pending: PendingRead,
}

impl FileIoLogger {
    /// Create a logger with no tracked handles.
    pub fn new() -> Self {
        Self::default()
    }

    /// The handle correlation table.
    pub fn handles(&self) -> &HandleMap {
        &self.handles
    }

    /// The pending-read slot.
    pub fn pending(&self) -> &PendingRead {
        &self.pending
    }

    /// Forget all handles and any pending read.
    pub fn reset(&mut self) {
        self.handles.clear();
        self.pending.clear();
    }

    /// Record a handle returned by a successful open or create.
    pub fn record_handle(&mut self, handle: u16, filename: &str) -> bool {
        self.handles.record(handle, filename)
    }

    /// Forget a handle without logging.
    pub fn forget_handle(&mut self, handle: u16) {
        self.handles.forget(handle);
    }

    /// INT 21h/AH=3Ch, before the call.
    pub fn log_create(&self, writer: &mut TraceWriter, filename: &str, attributes: u16) {
        writer.emit_timed(LINE_CAPACITY, |line| {
            write!(line, "FILE CREATE: \"{}\" attributes=0x{:04X}", filename, attributes)
        });
    }

    /// INT 21h/AH=3Dh, before the call.
    pub fn log_open(&self, writer: &mut TraceWriter, filename: &str, al_mode: u8) {
        writer.emit_timed(LINE_CAPACITY, |line| {
            write!(
                line,
                "FILE OPEN: \"{}\" mode={} (AL=0x{:02X})",
                filename,
                access_mode_name(al_mode),
                al_mode
            )
        });
    }

    /// INT 21h/AH=3Eh, before the call. The mapping is removed only after
    /// the line is written so the name still resolves.
    pub fn log_close(&mut self, writer: &mut TraceWriter, handle: u16) {
        let name = self.handles.lookup(handle);
        writer.emit_timed(LINE_CAPACITY, |line| {
            write!(line, "FILE CLOSE: \"{}\" (handle={})", name, handle)
        });
        self.handles.forget(handle);
    }

    /// INT 21h/AH=3Fh, before the call.
    pub fn log_read_issued(
        &mut self,
        writer: &mut TraceWriter,
        handle: u16,
        requested: u16,
        segment: u16,
        offset: u16,
    ) {
        self.pending.begin(ReadRequest {
            handle,
            requested,
            segment,
            offset,
        });

        let name = self.handles.lookup(handle);
        writer.emit_timed(LINE_CAPACITY, |line| {
            write!(
                line,
                "FILE READ: \"{}\" (handle={}) requested={} buffer={:04X}:{:04X}",
                name, handle, requested, segment, offset
            )
        });
    }

    /// INT 21h/AH=3Fh, after the call.
    ///
    /// Renders the result line and a hex dump of at most
    /// `min(hex_cap, actual, 512)` bytes from `buffer`. Does nothing if no
    /// read for `handle` is pending.
    pub fn log_read_completed<M: Machine + ?Sized>(
        &mut self,
        writer: &mut TraceWriter,
        machine: &M,
        handle: u16,
        actual: u16,
        buffer: u32,
        hex_cap: usize,
    ) {
        if self.pending.complete(handle).is_none() {
            debug!(handle, "Read completion without a matching request");
            return;
        }

        let name = self.handles.lookup(handle);
        writer.emit_timed(LINE_CAPACITY, |line| {
            write!(line, "FILE READ RESULT: \"{}\" (handle={}) actual={}", name, handle, actual)
        });

        let dump_len = hex_cap
            .min(usize::from(actual))
            .min(MAX_HEX_DUMP_BYTES as usize);
        if dump_len == 0 {
            return;
        }

        let mut data = [0u8; MAX_HEX_DUMP_BYTES as usize];
        for (i, byte) in data[..dump_len].iter_mut().enumerate() {
            *byte = machine.read_byte(buffer.wrapping_add(i as u32));
        }
        writer.emit_timed(DATA_LINE_CAPACITY, |line| {
            write!(line, "FILE DATA [first {} bytes]: ", dump_len)?;
            write_hex_bytes(line, &data[..dump_len])
        });
    }
}
