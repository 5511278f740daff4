//! Video mode switch logger.

use std::fmt::Write as _;

use dostrace_core::{LINE_CAPACITY, TraceWriter};

use crate::tables::describe_video_mode;

/// Clear-screen suppression bit for BIOS modes (INT 10h/AH=00h).
pub const LEGACY_NO_CLEAR: u16 = 0x0080;

/// Clear-screen suppression bit for VESA modes (INT 10h/AX=4F02h).
pub const VESA_NO_CLEAR: u16 = 0x8000;

/// Mode number with the clear-screen suppression bit removed.
pub fn base_mode(mode: u16) -> u16 {
    if mode <= 0x00FF {
        mode & !LEGACY_NO_CLEAR
    } else {
        mode & !VESA_NO_CLEAR
    }
}

/// Description of a mode value as passed to the BIOS.
pub fn describe_mode_value(mode: u16) -> &'static str {
    describe_video_mode(base_mode(mode))
}

/// Log a mode switch. The raw values are displayed, suppression bit included.
pub fn log_mode_switch(writer: &mut TraceWriter, old_mode: u16, new_mode: u16) {
    writer.emit_timed(LINE_CAPACITY, |line| {
        write!(
            line,
            "VIDEO MODE SWITCH: {:02X}h ({}) -> {:02X}h ({})",
            old_mode,
            describe_mode_value(old_mode),
            new_mode,
            describe_mode_value(new_mode)
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use dostrace_core::{ManualClock, TraceSink};

    #[test]
    fn test_base_mode() {
        assert_eq!(base_mode(0x13), 0x13);
        assert_eq!(base_mode(0x93), 0x13);
        assert_eq!(base_mode(0x0101), 0x0101);
        assert_eq!(base_mode(0x8101), 0x0101);
    }

    #[test]
    fn test_mode_switch_line() {
        let (sink, capture) = TraceSink::memory();
        let mut writer = TraceWriter::new(sink, Box::new(ManualClock::new()));
        writer.reset_epoch();

        log_mode_switch(&mut writer, 0x03, 0x13);
        assert_eq!(
            capture.lines()[0],
            format!(
                "[T+00000000ms] VIDEO MODE SWITCH: 03h ({}) -> 13h ({})",
                describe_video_mode(0x03),
                describe_video_mode(0x13)
            )
        );
    }

    #[test]
    fn test_suppression_bit_kept_in_display() {
        let (sink, capture) = TraceSink::memory();
        let mut writer = TraceWriter::new(sink, Box::new(ManualClock::new()));

        log_mode_switch(&mut writer, 0x03, 0x93);
        let line = &capture.lines()[0];
        assert!(line.contains(&format!("-> 93h ({})", describe_video_mode(0x13))));
    }

    #[test]
    fn test_unknown_mode() {
        let (sink, capture) = TraceSink::memory();
        let mut writer = TraceWriter::new(sink, Box::new(ManualClock::new()));

        log_mode_switch(&mut writer, 0x7E, 0x03);
        assert!(capture.lines()[0].contains("7Eh (unknown mode)"));
    }
}
