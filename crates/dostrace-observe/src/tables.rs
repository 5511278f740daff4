//! Static description tables for interrupts and video modes.
//!
//! Each table is a slice sorted by key and searched with a binary search.
//! The descriptions exist purely for readability of the trace.

/// INT 21h functions, keyed by AH.
const INT21: &[(u8, &str)] = &[
    (0x00, "Terminate Program"),
    (0x01, "Read Char (STDIN, echo)"),
    (0x02, "Write Char (STDOUT)"),
    (0x06, "Direct Console I/O"),
    (0x08, "Read Char (STDIN, no echo)"),
    (0x09, "Write String"),
    (0x0A, "Buffered Keyboard Input"),
    (0x0B, "Check Keyboard Status"),
    (0x0C, "Flush Buffer, Read Keyboard"),
    (0x0D, "Disk Reset"),
    (0x0E, "Select Drive"),
    (0x19, "Get Current Drive"),
    (0x1A, "Set DTA"),
    (0x25, "Set Interrupt Vector"),
    (0x26, "Create New PSP"),
    (0x2A, "Get Date"),
    (0x2B, "Set Date"),
    (0x2C, "Get Time"),
    (0x2D, "Set Time"),
    (0x2F, "Get DTA"),
    (0x30, "Get DOS Version"),
    (0x31, "Terminate and Stay Resident"),
    (0x33, "Extended Break Handling"),
    (0x35, "Get Interrupt Vector"),
    (0x36, "Get Free Disk Space"),
    (0x39, "Create Directory"),
    (0x3A, "Remove Directory"),
    (0x3B, "Change Directory"),
    (0x3C, "Create/Truncate File"),
    (0x3D, "Open File"),
    (0x3E, "Close File"),
    (0x3F, "Read File/Device"),
    (0x40, "Write File/Device"),
    (0x41, "Delete File"),
    (0x42, "Seek File"),
    (0x43, "Get/Set File Attributes"),
    (0x44, "IOCTL"),
    (0x45, "Duplicate File Handle"),
    (0x46, "Force Duplicate File Handle"),
    (0x47, "Get Current Directory"),
    (0x48, "Allocate Memory"),
    (0x49, "Free Memory"),
    (0x4A, "Resize Memory Block"),
    (0x4B, "EXEC Load/Execute Program"),
    (0x4C, "Terminate with Return Code"),
    (0x4D, "Get Return Code"),
    (0x4E, "Find First File"),
    (0x4F, "Find Next File"),
    (0x56, "Rename File"),
    (0x57, "Get/Set File Date&Time"),
    (0x59, "Get Extended Error"),
    (0x5A, "Create Temp File"),
    (0x5B, "Create New File"),
    (0x5C, "Lock/Unlock File Region"),
    (0x5E, "Network Functions"),
    (0x5F, "Redirection Functions"),
    (0x62, "Get Current PSP"),
    (0x6C, "Extended Open/Create"),
];

/// INT 10h functions, keyed by AH.
const INT10: &[(u8, &str)] = &[
    (0x00, "Set Video Mode"),
    (0x01, "Set Text-Mode Cursor Shape"),
    (0x02, "Set Cursor Position"),
    (0x03, "Get Cursor Position/Shape"),
    (0x04, "Read Light Pen"),
    (0x05, "Set Display Page"),
    (0x06, "Scroll Window Up"),
    (0x07, "Scroll Window Down"),
    (0x08, "Read Char/Attribute at Cursor"),
    (0x09, "Write Char/Attribute at Cursor"),
    (0x0A, "Write Char at Cursor"),
    (0x0B, "Set Color Palette"),
    (0x0C, "Write Graphics Pixel"),
    (0x0D, "Read Graphics Pixel"),
    (0x0E, "Teletype Output"),
    (0x0F, "Get Current Video Mode"),
    (0x10, "Set/Get Palette Registers"),
    (0x11, "Character Generator Functions"),
    (0x12, "Video Subsystem Configuration"),
    (0x13, "Write String"),
    (0x1A, "Video Display Combination"),
    (0x1B, "Get Video State"),
    (0x1C, "Save/Restore Video State"),
    (0x4F, "VESA/VBE Functions"),
];

/// INT 13h functions, keyed by AH.
const INT13: &[(u8, &str)] = &[
    (0x00, "Reset Disk"),
    (0x01, "Get Disk Status"),
    (0x02, "Read Sectors"),
    (0x03, "Write Sectors"),
    (0x04, "Verify Sectors"),
    (0x08, "Get Drive Parameters"),
    (0x0C, "Seek"),
    (0x15, "Get Drive Type"),
    (0x41, "Check Extensions Present"),
    (0x42, "Extended Read Sectors"),
    (0x43, "Extended Write Sectors"),
];

/// INT 16h functions, keyed by AH.
const INT16: &[(u8, &str)] = &[
    (0x00, "Read Keystroke"),
    (0x01, "Check Keystroke Buffer"),
    (0x02, "Get Shift Flags"),
    (0x03, "Set Repeat Rate"),
    (0x10, "Read Extended Keystroke"),
    (0x11, "Check Extended Keystroke"),
    (0x12, "Get Extended Shift Flags"),
];

/// INT 33h functions, keyed by AL (AH is zero for the classic calls).
const INT33: &[(u8, &str)] = &[
    (0x00, "Mouse Reset/Get Status"),
    (0x01, "Show Mouse Cursor"),
    (0x02, "Hide Mouse Cursor"),
    (0x03, "Get Mouse Position/Button"),
    (0x04, "Set Mouse Position"),
    (0x05, "Get Button Press Info"),
    (0x06, "Get Button Release Info"),
    (0x07, "Set X Range"),
    (0x08, "Set Y Range"),
    (0x0B, "Read Mouse Motion Counters"),
    (0x0C, "Set Interrupt Subroutine"),
    (0x0F, "Set Mickey/Pixel Ratio"),
];

/// Interrupts described without a function number.
const SINGLE: &[(u8, &str)] = &[
    (0x08, "Timer IRQ"),
    (0x09, "Keyboard IRQ"),
    (0x1C, "Timer Tick"),
    (0x2F, "Multiplex Interrupt"),
];

/// Which register selects the function within a service group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector {
    Ah,
    Al,
}

/// A documented interrupt service group.
struct ServiceGroup {
    int_num: u8,
    selector: Selector,
    functions: &'static [(u8, &'static str)],
    fallback: &'static str,
}

/// Service groups, sorted by interrupt number.
const GROUPS: &[ServiceGroup] = &[
    ServiceGroup {
        int_num: 0x10,
        selector: Selector::Ah,
        functions: INT10,
        fallback: "Video BIOS Function",
    },
    ServiceGroup {
        int_num: 0x13,
        selector: Selector::Ah,
        functions: INT13,
        fallback: "Disk BIOS Function",
    },
    ServiceGroup {
        int_num: 0x16,
        selector: Selector::Ah,
        functions: INT16,
        fallback: "Keyboard BIOS Function",
    },
    ServiceGroup {
        int_num: 0x21,
        selector: Selector::Ah,
        functions: INT21,
        fallback: "DOS Function",
    },
    ServiceGroup {
        int_num: 0x33,
        selector: Selector::Al,
        functions: INT33,
        fallback: "Mouse Function",
    },
];

fn lookup<K: Ord + Copy>(table: &'static [(K, &'static str)], key: K) -> Option<&'static str> {
    table
        .binary_search_by_key(&key, |(k, _)| *k)
        .ok()
        .map(|index| table[index].1)
}

/// Describe an interrupt call from its number and AH/AL.
///
/// Returns an empty string for interrupts outside the covered groups.
pub fn describe_interrupt(int_num: u8, ah: u8, al: u8) -> &'static str {
    if let Ok(index) = GROUPS.binary_search_by_key(&int_num, |g| g.int_num) {
        let group = &GROUPS[index];
        let function = match group.selector {
            Selector::Ah => ah,
            Selector::Al => al,
        };
        return lookup(group.functions, function).unwrap_or(group.fallback);
    }
    lookup(SINGLE, int_num).unwrap_or("")
}

/// BIOS and VESA video modes.
const VIDEO_MODES: &[(u16, &str)] = &[
    (0x00, "40x25 16-color text (B&W)"),
    (0x01, "40x25 16-color text"),
    (0x02, "80x25 16-color text (B&W)"),
    (0x03, "80x25 16-color text"),
    (0x04, "320x200 4-color CGA"),
    (0x05, "320x200 4-color CGA (B&W)"),
    (0x06, "640x200 2-color CGA"),
    (0x07, "80x25 monochrome text (MDA/Hercules)"),
    (0x0D, "320x200 16-color EGA"),
    (0x0E, "640x200 16-color EGA"),
    (0x0F, "640x350 monochrome EGA"),
    (0x10, "640x350 16-color EGA"),
    (0x11, "640x480 2-color VGA"),
    (0x12, "640x480 16-color VGA"),
    (0x13, "320x200 256-color VGA"),
    (0x100, "640x400 256-color VESA"),
    (0x101, "640x480 256-color VESA"),
    (0x102, "800x600 16-color VESA"),
    (0x103, "800x600 256-color VESA"),
    (0x104, "1024x768 16-color VESA"),
    (0x105, "1024x768 256-color VESA"),
    (0x106, "1280x1024 16-color VESA"),
    (0x107, "1280x1024 256-color VESA"),
    (0x10D, "320x200 32K-color VESA"),
    (0x10E, "320x200 64K-color VESA"),
    (0x10F, "320x200 16M-color VESA"),
    (0x110, "640x480 32K-color VESA"),
    (0x111, "640x480 64K-color VESA"),
    (0x112, "640x480 16M-color VESA"),
    (0x113, "800x600 32K-color VESA"),
    (0x114, "800x600 64K-color VESA"),
    (0x115, "800x600 16M-color VESA"),
    (0x116, "1024x768 32K-color VESA"),
    (0x117, "1024x768 64K-color VESA"),
    (0x118, "1024x768 16M-color VESA"),
];

/// Description for a video mode number with the no-clear bit already
/// removed. Unknown modes yield `"unknown mode"`.
pub fn describe_video_mode(mode: u16) -> &'static str {
    lookup(VIDEO_MODES, mode).unwrap_or("unknown mode")
}
