//! Configuration types for the trace engine.
//!
//! A [`TraceConfig`] is the immutable-per-session snapshot of the
//! `[debugtrace]` options. It can be built in code with the `with_*` methods
//! or loaded from TOML, either as a bare table or as a document containing a
//! `[debugtrace]` section.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Name of the configuration section.
pub const SECTION: &str = "debugtrace";

/// Literal `logfile` value that selects the console.
pub const CONSOLE_TARGET: &str = "stdout";

/// Hard ceiling for the per-read hex dump, regardless of configuration.
pub const MAX_HEX_DUMP_BYTES: u32 = 512;

/// Where trace lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// The process console (stdout).
    Console,
    /// A file, truncated when opened.
    File(PathBuf),
}

impl LogTarget {
    /// Parse a `logfile` value. `stdout` and the empty string mean console.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == CONSOLE_TARGET {
            LogTarget::Console
        } else {
            LogTarget::File(PathBuf::from(value))
        }
    }

    /// Check if this target is the console.
    pub fn is_console(&self) -> bool {
        matches!(self, LogTarget::Console)
    }
}

impl std::fmt::Display for LogTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogTarget::Console => f.write_str(CONSOLE_TARGET),
            LogTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Configuration snapshot for a trace session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Master switch. When false the session never opens a sink.
    pub enabled: bool,

    /// Log file path, or `stdout` for the console.
    pub logfile: String,

    /// Log each fetched instruction with register state.
    pub trace_instructions: bool,

    /// Log software interrupt calls.
    pub trace_interrupts: bool,

    /// Log DOS file create/open/close/read operations.
    pub trace_file_io: bool,

    /// Log video mode switches.
    pub trace_video_modes: bool,

    /// Defer activation until the first program EXEC.
    ///
    /// When false, tracing starts eagerly at init.
    pub auto_trace_on_exec: bool,

    /// Comma-separated two-digit hex interrupt numbers never logged.
    pub exclude_interrupts: String,

    /// Bytes to hex-dump after each file read (0 disables, max 512).
    pub file_read_hex_dump_bytes: u32,

    /// Log every Nth instruction.
    pub instruction_sample_rate: u32,

    /// Advertised log rotation size in megabytes. Not enforced.
    pub max_log_size_mb: u32,

    /// Only let an EXEC activate tracing from the interactive prompt,
    /// never from inside a batch script.
    pub interactive_only: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            logfile: "game_trace.log".to_string(),
            trace_instructions: true,
            trace_interrupts: true,
            trace_file_io: true,
            trace_video_modes: true,
            auto_trace_on_exec: true,
            exclude_interrupts: "08,1C".to_string(),
            file_read_hex_dump_bytes: 64,
            instruction_sample_rate: 1,
            max_log_size_mb: 0,
            interactive_only: false,
        }
    }
}

impl TraceConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the trace system.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the log target (`stdout` or a path).
    pub fn with_logfile(mut self, logfile: impl Into<String>) -> Self {
        self.logfile = logfile.into();
        self
    }

    /// Enable or disable instruction tracing.
    pub fn with_instructions(mut self, enabled: bool) -> Self {
        self.trace_instructions = enabled;
        self
    }

    /// Enable or disable interrupt tracing.
    pub fn with_interrupts(mut self, enabled: bool) -> Self {
        self.trace_interrupts = enabled;
        self
    }

    /// Enable or disable file I/O tracing.
    pub fn with_file_io(mut self, enabled: bool) -> Self {
        self.trace_file_io = enabled;
        self
    }

    /// Enable or disable video mode tracing.
    pub fn with_video_modes(mut self, enabled: bool) -> Self {
        self.trace_video_modes = enabled;
        self
    }

    /// Choose between EXEC-triggered (true) and eager (false) activation.
    pub fn with_auto_trace_on_exec(mut self, enabled: bool) -> Self {
        self.auto_trace_on_exec = enabled;
        self
    }

    /// Set the interrupt exclusion list.
    pub fn with_excluded_interrupts(mut self, list: impl Into<String>) -> Self {
        self.exclude_interrupts = list.into();
        self
    }

    /// Set the hex dump size for file reads.
    pub fn with_hex_dump_bytes(mut self, bytes: u32) -> Self {
        self.file_read_hex_dump_bytes = bytes;
        self
    }

    /// Set the instruction sampling stride.
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.instruction_sample_rate = rate;
        self
    }

    /// Set the advertised rotation size.
    pub fn with_max_log_size_mb(mut self, megabytes: u32) -> Self {
        self.max_log_size_mb = megabytes;
        self
    }

    /// Restrict EXEC activation to the interactive prompt.
    pub fn with_interactive_only(mut self, enabled: bool) -> Self {
        self.interactive_only = enabled;
        self
    }

    /// Resolve the `logfile` option.
    pub fn log_target(&self) -> LogTarget {
        LogTarget::parse(&self.logfile)
    }

    /// The fast global enable flag derived from this snapshot.
    ///
    /// True only in eager mode; in EXEC-triggered mode tracing starts later.
    pub fn eager_enabled(&self) -> bool {
        self.enabled && !self.auto_trace_on_exec
    }

    /// Effective hex dump cap, clamped to [`MAX_HEX_DUMP_BYTES`].
    pub fn hex_dump_bytes(&self) -> usize {
        self.file_read_hex_dump_bytes.min(MAX_HEX_DUMP_BYTES) as usize
    }

    /// Effective sampling stride, never below 1.
    pub fn sample_rate(&self) -> u32 {
        self.instruction_sample_rate.max(1)
    }

    /// Validate option ranges and the exclusion list.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.file_read_hex_dump_bytes > MAX_HEX_DUMP_BYTES {
            return Err(ConfigError::OutOfRange {
                option: "file_read_hex_dump_bytes",
                value: i64::from(self.file_read_hex_dump_bytes),
                expected: "0..=512",
            });
        }
        if self.instruction_sample_rate == 0 {
            return Err(ConfigError::OutOfRange {
                option: "instruction_sample_rate",
                value: 0,
                expected: ">= 1",
            });
        }
        for token in self.exclude_interrupts.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ConfigError::InvalidExclusion(token.to_string()));
            }
        }
        Ok(())
    }

    /// Clamp out-of-range values instead of rejecting them.
    ///
    /// Malformed exclusion tokens are left in place; they simply never match.
    pub fn sanitized(mut self) -> Self {
        self.file_read_hex_dump_bytes = self.file_read_hex_dump_bytes.min(MAX_HEX_DUMP_BYTES);
        self.instruction_sample_rate = self.instruction_sample_rate.max(1);
        self
    }

    /// Parse a configuration from TOML.
    ///
    /// Accepts either a document with a `[debugtrace]` section or a bare
    /// table of options. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let mut table: toml::Table = source.parse()?;
        let value = match table.remove(SECTION) {
            Some(toml::Value::Table(section)) => toml::Value::Table(section),
            Some(_) => return Err(ConfigError::SectionNotTable),
            None => toml::Value::Table(table),
        };
        Ok(value.try_into()?)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        config.validate()?;
        Ok(config)
    }

    /// Render this snapshot as a `[debugtrace]` TOML section.
    pub fn to_toml_section(&self) -> String {
        let mut out = format!("[{}]\n", SECTION);
        // Serializing a struct of plain scalars cannot fail.
        if let Ok(body) = toml::to_string(self) {
            out.push_str(&body);
        }
        out
    }
}

/// A documented configuration option.
#[derive(Debug, Clone, Copy)]
pub struct OptionDescriptor {
    /// Key inside `[debugtrace]`.
    pub name: &'static str,
    /// Default value, as TOML.
    pub default: &'static str,
    /// Help text.
    pub help: &'static str,
}

/// Every recognized option, in section order.
pub const OPTIONS: &[OptionDescriptor] = &[
    OptionDescriptor {
        name: "enabled",
        default: "false",
        help: "Enable the dynamic debugging and reverse-engineering trace system.",
    },
    OptionDescriptor {
        name: "logfile",
        default: "\"game_trace.log\"",
        help: "Path of the trace log file, or 'stdout' to write to the console.",
    },
    OptionDescriptor {
        name: "trace_instructions",
        default: "true",
        help: "Log each executed x86 instruction with register state.",
    },
    OptionDescriptor {
        name: "trace_interrupts",
        default: "true",
        help: "Log software interrupt calls with register state.",
    },
    OptionDescriptor {
        name: "trace_file_io",
        default: "true",
        help: "Log DOS file I/O operations (create, open, read, close) with hex dumps.",
    },
    OptionDescriptor {
        name: "trace_video_modes",
        default: "true",
        help: "Log INT 10h video mode switches.",
    },
    OptionDescriptor {
        name: "auto_trace_on_exec",
        default: "true",
        help: "Start full tracing when a program is loaded via INT 21h/AH=4Bh (EXEC).",
    },
    OptionDescriptor {
        name: "exclude_interrupts",
        default: "\"08,1C\"",
        help: "Comma-separated interrupt numbers (hex) to exclude from logging.",
    },
    OptionDescriptor {
        name: "file_read_hex_dump_bytes",
        default: "64",
        help: "Bytes to hex-dump for each file read (0 disables, at most 512).",
    },
    OptionDescriptor {
        name: "instruction_sample_rate",
        default: "1",
        help: "Log every Nth instruction (1 logs all).",
    },
    OptionDescriptor {
        name: "max_log_size_mb",
        default: "0",
        help: "Maximum log size before rotation (0 = unlimited). Currently not enforced.",
    },
    OptionDescriptor {
        name: "interactive_only",
        default: "false",
        help: "Only activate on EXEC from the interactive prompt, not from batch scripts.",
    },
];

/// Render the documented default `[debugtrace]` section.
pub fn defaults_toml() -> String {
    let mut out = format!("[{}]\n", SECTION);
    for option in OPTIONS {
        let _ = writeln!(out, "# {}", option.help);
        let _ = writeln!(out, "{} = {}", option.name, option.default);
    }
    out
}
