//! Host collaborator interfaces.
//!
//! The tracer never owns CPU or memory state; it reads them through the
//! [`Machine`] trait the host emulator implements. [`Shell`] reports whether
//! the command shell is currently running a batch script.

/// Size of the real-mode address space.
pub const REAL_MODE_MEMORY: usize = 1 << 20;

/// Mask applied to real-mode physical addresses.
pub const REAL_MODE_MASK: u32 = 0xF_FFFF;

/// 16-bit register file as seen at the time of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub ax: u16,
    pub bx: u16,
    pub cx: u16,
    pub dx: u16,
    pub si: u16,
    pub di: u16,
    pub bp: u16,
    pub sp: u16,
    pub cs: u16,
    pub ds: u16,
    pub es: u16,
    pub ss: u16,
    pub ip: u16,
    pub flags: u16,
}

impl Registers {
    /// High byte of AX.
    pub fn ah(&self) -> u8 {
        (self.ax >> 8) as u8
    }

    /// Low byte of AX.
    pub fn al(&self) -> u8 {
        (self.ax & 0xFF) as u8
    }
}

/// Read-only view of the emulated machine.
pub trait Machine {
    /// Current register state, with lazily computed flags materialized.
    fn registers(&self) -> Registers;

    /// Read one byte of physical memory.
    fn read_byte(&self, addr: u32) -> u8;
}

/// State of the emulated command shell.
pub trait Shell {
    /// True while a batch script is executing.
    fn is_batch_running(&self) -> bool;
}

/// Physical address for `segment:offset`, wrapped to 20 bits as real
/// hardware without the A20 line does.
pub fn real_mode_address(segment: u16, offset: u16) -> u32 {
    ((u32::from(segment) << 4) + u32::from(offset)) & REAL_MODE_MASK
}

/// A flat 1 MiB machine with settable registers.
///
/// Used for scripted replay and tests.
#[derive(Clone)]
pub struct FlatMachine {
    registers: Registers,
    memory: Vec<u8>,
    batch_running: bool,
}

impl FlatMachine {
    /// Create a machine with zeroed memory and registers.
    pub fn new() -> Self {
        Self {
            registers: Registers::default(),
            memory: vec![0; REAL_MODE_MEMORY],
            batch_running: false,
        }
    }

    /// Replace the register file.
    pub fn set_registers(&mut self, registers: Registers) {
        self.registers = registers;
    }

    /// Mutable access to the register file.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// Write bytes starting at a physical address, wrapping at 1 MiB.
    pub fn poke(&mut self, addr: u32, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            let at = (addr.wrapping_add(i as u32) & REAL_MODE_MASK) as usize;
            self.memory[at] = *byte;
        }
    }

    /// Mark the shell as running (or not running) a batch script.
    pub fn set_batch_running(&mut self, running: bool) {
        self.batch_running = running;
    }
}

impl Default for FlatMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for FlatMachine {
    fn registers(&self) -> Registers {
        self.registers
    }

    fn read_byte(&self, addr: u32) -> u8 {
        self.memory[(addr & REAL_MODE_MASK) as usize]
    }
}

impl Shell for FlatMachine {
    fn is_batch_running(&self) -> bool {
        self.batch_running
    }
}

impl std::fmt::Debug for FlatMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatMachine")
            .field("registers", &self.registers)
            .field("batch_running", &self.batch_running)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_halves() {
        let regs = Registers {
            ax: 0x4C01,
            ..Default::default()
        };
        assert_eq!(regs.ah(), 0x4C);
        assert_eq!(regs.al(), 0x01);
    }

    #[test]
    fn test_real_mode_address() {
        assert_eq!(real_mode_address(0x1234, 0x0010), 0x12350);
        assert_eq!(real_mode_address(0xB800, 0x0000), 0xB8000);
        // FFFF:0010 is 0x100000, which wraps to 0 without A20
        assert_eq!(real_mode_address(0xFFFF, 0x0010), 0x00000);
        assert_eq!(real_mode_address(0xFFFF, 0xFFFF), 0x0FFEF);
    }

    #[test]
    fn test_flat_machine_poke_wraps() {
        let mut machine = FlatMachine::new();
        machine.poke(0xFFFFE, &[0xAA, 0xBB, 0xCC]);
        assert_eq!(machine.read_byte(0xFFFFE), 0xAA);
        assert_eq!(machine.read_byte(0xFFFFF), 0xBB);
        assert_eq!(machine.read_byte(0x00000), 0xCC);
        assert_eq!(machine.read_byte(0x100000), 0xCC);
    }

    #[test]
    fn test_flat_machine_shell_state() {
        let mut machine = FlatMachine::new();
        assert!(!machine.is_batch_running());
        machine.set_batch_running(true);
        assert!(machine.is_batch_running());
    }
}
