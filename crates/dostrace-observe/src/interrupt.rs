//! Software interrupt logger.

use std::fmt::Write as _;

use dostrace_core::{LINE_CAPACITY, Machine, TraceWriter};

use crate::tables::describe_interrupt;

/// Log a software interrupt call with the register state at call time.
///
/// The exclusion list is applied by the caller.
pub fn log_interrupt<M: Machine + ?Sized>(writer: &mut TraceWriter, machine: &M, int_num: u8) {
    let regs = machine.registers();
    let (ah, al) = (regs.ah(), regs.al());
    let description = describe_interrupt(int_num, ah, al);

    writer.emit_timed(LINE_CAPACITY, |line| {
        write!(line, ">> INT {:02X}h AH={:02X}h AL={:02X}h", int_num, ah, al)?;
        if !description.is_empty() {
            write!(line, " ({})", description)?;
        }
        write!(
            line,
            "  AX={:04X} BX={:04X} CX={:04X} DX={:04X} SI={:04X} DI={:04X} DS={:04X} ES={:04X}",
            regs.ax, regs.bx, regs.cx, regs.dx, regs.si, regs.di, regs.ds, regs.es,
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use dostrace_core::{FlatMachine, ManualClock, MemorySink, Registers, TraceSink};

    fn writer() -> (TraceWriter, MemorySink) {
        let (sink, capture) = TraceSink::memory();
        let mut writer = TraceWriter::new(sink, Box::new(ManualClock::new()));
        writer.reset_epoch();
        (writer, capture)
    }

    fn machine_with_ax(ax: u16) -> FlatMachine {
        let mut machine = FlatMachine::new();
        machine.set_registers(Registers {
            ax,
            bx: 0x0010,
            cx: 0x0020,
            dx: 0x0030,
            si: 0x0040,
            di: 0x0050,
            ds: 0x1000,
            es: 0x2000,
            ..Default::default()
        });
        machine
    }

    #[test]
    fn test_described_interrupt() {
        let (mut writer, capture) = writer();
        log_interrupt(&mut writer, &machine_with_ax(0x3D02), 0x21);
        assert_eq!(
            capture.lines()[0],
            "[T+00000000ms] >> INT 21h AH=3Dh AL=02h (Open File)  \
             AX=3D02 BX=0010 CX=0020 DX=0030 SI=0040 DI=0050 DS=1000 ES=2000"
        );
    }

    #[test]
    fn test_undescribed_interrupt_omits_description() {
        let (mut writer, capture) = writer();
        log_interrupt(&mut writer, &machine_with_ax(0x4000), 0x67);
        let line = &capture.lines()[0];
        assert!(line.contains(">> INT 67h AH=40h AL=00h  AX=4000"));
        assert!(!line.contains('('));
    }

    #[test]
    fn test_every_interrupt_produces_one_line() {
        let (mut writer, capture) = writer();
        let machine = machine_with_ax(0x0000);
        for n in 0..=255u8 {
            log_interrupt(&mut writer, &machine, n);
        }
        let lines = capture.lines();
        assert_eq!(lines.len(), 256);
        for (n, line) in lines.iter().enumerate() {
            assert!(line.contains(&format!("INT {:02X}h AH=00h AL=00h", n)));
        }
    }
}
