//! Per-instruction logger.
//!
//! No disassembler is embedded: each sampled instruction is logged as the
//! raw bytes about to be executed at CS:IP, next to the full 16-bit register
//! state, which is enough to line the trace up with an external disassembly.

use std::fmt::Write as _;

use dostrace_core::{LINE_CAPACITY, Machine, TraceWriter, real_mode_address};

use crate::hex::PaddedHex;

/// Opcode bytes shown per instruction.
pub const OPCODE_WINDOW: usize = 8;

/// Width of the rendered opcode column (`"XX "` per byte, no trailing space).
const OPCODE_COLUMN: usize = OPCODE_WINDOW * 3 - 1;

/// Sampling instruction logger.
#[derive(Debug, Clone)]
pub struct InstructionLogger {
    stride: u32,
    counter: u32,
}

impl InstructionLogger {
    /// Create a logger that records every `stride`th instruction.
    pub fn new(stride: u32) -> Self {
        Self {
            stride: stride.max(1),
            counter: 0,
        }
    }

    /// Current sampling stride.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Change the stride and restart the sampling counter.
    pub fn set_stride(&mut self, stride: u32) {
        self.stride = stride.max(1);
        self.counter = 0;
    }

    /// Advance the sampling counter; true when this instruction is logged.
    pub fn should_sample(&mut self) -> bool {
        if self.stride <= 1 {
            return true;
        }
        self.counter += 1;
        if self.counter < self.stride {
            return false;
        }
        self.counter = 0;
        true
    }

    /// Log the instruction at `cs:ip` if it falls on the sampling stride.
    pub fn log<M: Machine + ?Sized>(&mut self, writer: &mut TraceWriter, machine: &M, cs: u16, ip: u16) {
        if !self.should_sample() {
            return;
        }

        let base = real_mode_address(cs, ip);
        let mut opcode = [0u8; OPCODE_WINDOW];
        for (i, byte) in opcode.iter_mut().enumerate() {
            *byte = machine.read_byte(base.wrapping_add(i as u32));
        }
        let regs = machine.registers();

        writer.emit_timed(LINE_CAPACITY, |line| {
            write!(
                line,
                "CS:IP={:04X}:{:04X}  BYTES={}  \
                 AX={:04X} BX={:04X} CX={:04X} DX={:04X} \
                 SI={:04X} DI={:04X} BP={:04X} SP={:04X} \
                 DS={:04X} ES={:04X} SS={:04X} FL={:04X}",
                cs,
                ip,
                PaddedHex::new(&opcode, OPCODE_COLUMN),
                regs.ax,
                regs.bx,
                regs.cx,
                regs.dx,
                regs.si,
                regs.di,
                regs.bp,
                regs.sp,
                regs.ds,
                regs.es,
                regs.ss,
                regs.flags,
            )
        });
    }
}

impl Default for InstructionLogger {
    fn default() -> Self {
        Self::new(1)
    }
}
