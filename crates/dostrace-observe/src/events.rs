//! Serializable trace events.
//!
//! One variant per entry point the host emulator calls, plus a few host-side
//! mutations (`set_registers`, `poke`, `set_batch`) that only scripted replay
//! needs to stage machine state between events. Encoded as JSON objects
//! tagged by `event`:
//!
//! ```text
//! {"event":"program_exec","filename":"GAME.EXE","cmdline":"/nosound"}
//! {"event":"interrupt_invoked","int_num":33}
//! ```

use serde::{Deserialize, Serialize};

use dostrace_core::{FlatMachine, Registers};

/// Events observed (or staged) during emulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// The CPU is about to execute the instruction at `cs:ip`.
    InstructionFetched {
        /// Code segment.
        cs: u16,
        /// Instruction pointer.
        ip: u16,
    },
    /// A software interrupt was invoked.
    InterruptInvoked {
        /// Interrupt number.
        int_num: u8,
    },
    /// INT 21h/AH=3Ch.
    FileCreated {
        /// Path as given by the program.
        filename: String,
        /// Attribute word (CX).
        attributes: u16,
    },
    /// INT 21h/AH=3Dh.
    FileOpened {
        /// Path as given by the program.
        filename: String,
        /// Access mode (AL).
        mode: u8,
    },
    /// A create or open succeeded and returned a handle.
    HandleOpened {
        /// Returned handle.
        handle: u16,
        /// Path used to open it.
        filename: String,
    },
    /// INT 21h/AH=3Eh.
    FileClosed {
        /// Handle being closed.
        handle: u16,
    },
    /// INT 21h/AH=3Fh, before the call.
    ReadIssued {
        /// Handle being read (BX).
        handle: u16,
        /// Bytes requested (CX).
        requested: u16,
        /// Buffer segment (DS).
        segment: u16,
        /// Buffer offset (DX).
        offset: u16,
    },
    /// INT 21h/AH=3Fh, after the call.
    ReadCompleted {
        /// Handle that was read.
        handle: u16,
        /// Bytes actually read (AX).
        actual: u16,
        /// Physical address of the destination buffer.
        buffer: u32,
    },
    /// INT 21h/AH=4Bh.
    ProgramExec {
        /// Program path.
        filename: String,
        /// Command tail.
        #[serde(default)]
        cmdline: Option<String>,
    },
    /// A program exited normally.
    ProgramTerminated {
        /// Exit code (AL).
        exit_code: u8,
    },
    /// A program exited and stayed resident.
    ProgramStayedResident {
        /// Exit code (AL).
        exit_code: u8,
    },
    /// INT 10h is about to switch video modes.
    VideoModeChanging {
        /// Mode in effect before the switch.
        old_mode: u16,
        /// Requested mode, including any no-clear bit.
        new_mode: u16,
    },
    /// Replay only: overwrite some registers.
    SetRegisters(RegisterPatch),
    /// Replay only: write bytes into memory.
    Poke {
        /// Physical address.
        address: u32,
        /// Raw bytes.
        #[serde(default)]
        bytes: Vec<u8>,
        /// Text written after `bytes`.
        #[serde(default)]
        text: Option<String>,
    },
    /// Replay only: set whether the shell is running a batch script.
    SetBatch {
        /// Whether a batch script is running.
        running: bool,
    },
}

impl TraceEvent {
    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            TraceEvent::InstructionFetched { .. } => "instruction_fetched",
            TraceEvent::InterruptInvoked { .. } => "interrupt_invoked",
            TraceEvent::FileCreated { .. } => "file_created",
            TraceEvent::FileOpened { .. } => "file_opened",
            TraceEvent::HandleOpened { .. } => "handle_opened",
            TraceEvent::FileClosed { .. } => "file_closed",
            TraceEvent::ReadIssued { .. } => "read_issued",
            TraceEvent::ReadCompleted { .. } => "read_completed",
            TraceEvent::ProgramExec { .. } => "program_exec",
            TraceEvent::ProgramTerminated { .. } => "program_terminated",
            TraceEvent::ProgramStayedResident { .. } => "program_stayed_resident",
            TraceEvent::VideoModeChanging { .. } => "video_mode_changing",
            TraceEvent::SetRegisters(_) => "set_registers",
            TraceEvent::Poke { .. } => "poke",
            TraceEvent::SetBatch { .. } => "set_batch",
        }
    }

    /// Whether this event changes host state instead of reaching the tracer.
    pub fn is_host_mutation(&self) -> bool {
        matches!(
            self,
            TraceEvent::SetRegisters(_) | TraceEvent::Poke { .. } | TraceEvent::SetBatch { .. }
        )
    }

    /// Apply a host mutation to a replay machine.
    ///
    /// Returns false (and leaves the machine alone) for tracer events.
    pub fn apply_to(&self, machine: &mut FlatMachine) -> bool {
        match self {
            TraceEvent::SetRegisters(patch) => {
                patch.apply(machine.registers_mut());
                true
            }
            TraceEvent::Poke {
                address,
                bytes,
                text,
            } => {
                machine.poke(*address, bytes);
                if let Some(text) = text {
                    let at = address.wrapping_add(bytes.len() as u32);
                    machine.poke(at, text.as_bytes());
                }
                true
            }
            TraceEvent::SetBatch { running } => {
                machine.set_batch_running(*running);
                true
            }
            _ => false,
        }
    }
}

/// Partial register update; absent fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterPatch {
    pub ax: Option<u16>,
    pub bx: Option<u16>,
    pub cx: Option<u16>,
    pub dx: Option<u16>,
    pub si: Option<u16>,
    pub di: Option<u16>,
    pub bp: Option<u16>,
    pub sp: Option<u16>,
    pub cs: Option<u16>,
    pub ds: Option<u16>,
    pub es: Option<u16>,
    pub ss: Option<u16>,
    pub ip: Option<u16>,
    pub flags: Option<u16>,
}

impl RegisterPatch {
    /// Overwrite the present fields of `regs`.
    pub fn apply(&self, regs: &mut Registers) {
        let fields = [
            (self.ax, &mut regs.ax),
            (self.bx, &mut regs.bx),
            (self.cx, &mut regs.cx),
            (self.dx, &mut regs.dx),
            (self.si, &mut regs.si),
            (self.di, &mut regs.di),
            (self.bp, &mut regs.bp),
            (self.sp, &mut regs.sp),
            (self.cs, &mut regs.cs),
            (self.ds, &mut regs.ds),
            (self.es, &mut regs.es),
            (self.ss, &mut regs.ss),
            (self.ip, &mut regs.ip),
            (self.flags, &mut regs.flags),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}
