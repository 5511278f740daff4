//! Trace output sink.
//!
//! [`TraceSink`] owns the destination stream. Every line is appended in a
//! single write together with its newline and flushed immediately, trading
//! throughput for a log that survives a crash of the host.
//!
//! [`TraceWriter`] is the single serialization point: it pairs the sink with
//! the elapsed-time clock and renders the `[T+%08ums]` and `[debugtrace]`
//! prefixes.

use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::clock::{Clock, Epoch};
use crate::config::LogTarget;
use crate::error::{SinkError, SinkResult};
use crate::line::{LINE_CAPACITY, LineBuf};

/// Tag used by banner lines.
pub const BANNER_TAG: &str = "[debugtrace]";

/// In-memory capture of trace lines.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Create an empty capture buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all captured lines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Take the captured lines, leaving the buffer empty.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    /// Number of captured lines.
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Check if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Count lines containing `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines.lock().iter().filter(|l| l.contains(needle)).count()
    }

    fn push(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Destination for trace lines.
#[derive(Debug)]
pub enum TraceSink {
    /// The process console. Never closed by the tracer.
    Console,
    /// A file opened (and owned) by the tracer.
    File {
        /// Path the file was opened at.
        path: PathBuf,
        /// Buffered writer, flushed after every line.
        writer: BufWriter<File>,
    },
    /// Shared in-memory capture.
    Memory(MemorySink),
}

impl TraceSink {
    /// The console sink.
    pub fn console() -> Self {
        TraceSink::Console
    }

    /// A fresh in-memory sink, returning a handle to read it back.
    pub fn memory() -> (Self, MemorySink) {
        let capture = MemorySink::new();
        (TraceSink::Memory(capture.clone()), capture)
    }

    /// Create (truncating) a log file.
    pub fn create_file(path: impl AsRef<Path>) -> SinkResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(TraceSink::File {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Open the sink for a configured target.
    ///
    /// Never fails: when the file cannot be created the console is returned
    /// together with the error, so the caller can surface the fallback.
    pub fn open(target: &LogTarget) -> (Self, Option<SinkError>) {
        match target {
            LogTarget::Console => (TraceSink::Console, None),
            LogTarget::File(path) => match Self::create_file(path) {
                Ok(sink) => {
                    debug!(path = %path.display(), "Opened trace log file");
                    (sink, None)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Falling back to console trace output");
                    (TraceSink::Console, Some(e))
                }
            },
        }
    }

    /// Whether the tracer opened this stream and must close it.
    pub fn owns_stream(&self) -> bool {
        matches!(self, TraceSink::File { .. })
    }

    /// Whether this is the console.
    pub fn is_console(&self) -> bool {
        matches!(self, TraceSink::Console)
    }

    /// Append one line and flush.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            TraceSink::Console => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.write_all(b"\n")?;
                out.flush()
            }
            TraceSink::File { writer, .. } => {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
                writer.flush()
            }
            TraceSink::Memory(capture) => {
                capture.push(line);
                Ok(())
            }
        }
    }

    /// Flush and release the stream. The console is left open.
    pub fn close(self) -> io::Result<()> {
        match self {
            TraceSink::Console => io::stdout().lock().flush(),
            TraceSink::File { mut writer, path } => {
                writer.flush()?;
                debug!(path = %path.display(), "Closed trace log file");
                Ok(())
            }
            TraceSink::Memory(_) => Ok(()),
        }
    }
}

/// Serialization point for trace lines.
pub struct TraceWriter {
    sink: TraceSink,
    clock: Box<dyn Clock>,
    epoch: Epoch,
    line: LineBuf,
    lines_written: u64,
    write_errors: u64,
}

impl TraceWriter {
    /// Create a writer over a sink with an unset epoch.
    pub fn new(sink: TraceSink, clock: Box<dyn Clock>) -> Self {
        Self {
            sink,
            clock,
            epoch: Epoch::unset(),
            line: LineBuf::with_capacity(LINE_CAPACITY),
            lines_written: 0,
            write_errors: 0,
        }
    }

    /// The underlying sink.
    pub fn sink(&self) -> &TraceSink {
        &self.sink
    }

    /// Milliseconds since the epoch (0 when unset).
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed_ms(self.clock.as_ref())
    }

    /// Move the epoch to now.
    pub fn reset_epoch(&mut self) {
        self.epoch.reset(self.clock.as_ref());
    }

    /// Set the epoch only if it was never set.
    pub fn ensure_epoch(&mut self) {
        if !self.epoch.is_set() {
            self.reset_epoch();
        }
    }

    /// Whether the epoch has been set.
    pub fn epoch_is_set(&self) -> bool {
        self.epoch.is_set()
    }

    /// Lines successfully written.
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Lines the sink failed to accept.
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Render and write a `[T+%08ums] ` prefixed line.
    pub fn emit_timed<F>(&mut self, capacity: usize, render: F)
    where
        F: FnOnce(&mut LineBuf) -> fmt::Result,
    {
        let elapsed = self.elapsed_ms();
        self.line.reset(capacity);
        let _ = write!(self.line, "[T+{:08}ms] ", elapsed);
        let _ = render(&mut self.line);
        self.commit();
    }

    /// Write a `[debugtrace] ` tagged banner line.
    pub fn emit_banner(&mut self, text: &str) {
        self.line.reset(LINE_CAPACITY);
        let _ = write!(self.line, "{} {}", BANNER_TAG, text);
        self.commit();
    }

    fn commit(&mut self) {
        match self.sink.write_line(self.line.as_str()) {
            Ok(()) => self.lines_written += 1,
            Err(e) => {
                self.write_errors += 1;
                if self.write_errors == 1 {
                    warn!(error = %e, "Failed to write trace line; further failures are counted silently");
                }
            }
        }
    }

    /// Flush and close the sink.
    pub fn close(self) -> io::Result<()> {
        self.sink.close()
    }
}

impl std::fmt::Debug for TraceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceWriter")
            .field("sink", &self.sink)
            .field("epoch", &self.epoch)
            .field("lines_written", &self.lines_written)
            .field("write_errors", &self.write_errors)
            .finish()
    }
}
